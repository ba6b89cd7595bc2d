//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Trackify - Expense tracking with AI insights
#[derive(Parser)]
#[command(name = "trackify")]
#[command(about = "Self-hosted expense tracker with AI-generated insights", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "trackify.db", global = true)]
    pub db: PathBuf,

    /// Identity whose records the command works on
    #[arg(long, default_value = "local-dev", global = true)]
    pub user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TRACKIFY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, requests need a Cloudflare Access identity header or an
        /// API key from TRACKIFY_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// Directory of static assets served under /static
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Manage expense records
    Records {
        #[command(subcommand)]
        action: Option<RecordsAction>,
    },

    /// Show total amount and days with expenses
    Stats,

    /// Generate AI insights over your records
    Insights {
        /// Print raw JSON instead of a formatted list
        #[arg(long)]
        json: bool,
    },

    /// Suggest a category for an expense description
    Categorize {
        /// Expense description
        description: String,
    },

    /// Ask a question about your spending
    Ask {
        /// The question
        question: String,
    },

    /// Check the configured AI backend
    AiHealth,

    /// Manage AI prompts
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum RecordsAction {
    /// List records, newest first
    List {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Add a record
    Add {
        /// Amount (negative for refunds)
        #[arg(allow_hyphen_values = true)]
        amount: f64,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Category (auto-categorized with AI when omitted)
        #[arg(short, long)]
        category: Option<String>,

        /// Date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a record
    Delete {
        /// Record id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List prompts and their override status
    List,

    /// Show a prompt's content
    Show {
        /// Prompt id (generate_insights, categorize_expense, answer_question)
        id: String,
    },
}
