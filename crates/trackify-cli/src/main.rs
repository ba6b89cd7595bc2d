//! Trackify CLI - Expense tracking with AI insights
//!
//! Usage:
//!   trackify init                       Initialize database
//!   trackify records add 12.50 -d Lunch Record an expense
//!   trackify stats                      Show totals
//!   trackify insights                   Generate AI insights
//!   trackify serve --port 3000          Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use trackify_core::UserId;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let user = UserId::new(cli.user.as_str());

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
        Commands::Records { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_records_list(&db, &user, 20),
                Some(RecordsAction::List { limit }) => {
                    commands::cmd_records_list(&db, &user, limit)
                }
                Some(RecordsAction::Add {
                    amount,
                    description,
                    category,
                    date,
                }) => {
                    let insights = commands::insight_adapter();
                    commands::cmd_records_add(
                        &db,
                        &user,
                        amount,
                        &description,
                        category.as_deref(),
                        date.as_deref(),
                        insights.as_ref(),
                    )
                    .await
                }
                Some(RecordsAction::Delete { id }) => commands::cmd_records_delete(&db, &user, &id),
            }
        }
        Commands::Stats => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_stats(&db, &user)
        }
        Commands::Insights { json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let insights = commands::require_insight_adapter()?;
            commands::cmd_insights(&db, &user, &insights, json).await
        }
        Commands::Categorize { description } => {
            let insights = commands::require_insight_adapter()?;
            commands::cmd_categorize(&insights, &description).await
        }
        Commands::Ask { question } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let insights = commands::require_insight_adapter()?;
            commands::cmd_ask(&db, &user, &insights, &question).await
        }
        Commands::AiHealth => commands::cmd_ai_health().await,
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { id }) => commands::cmd_prompts_show(&id),
        },
    }
}
