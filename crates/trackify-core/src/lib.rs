//! Trackify Core Library
//!
//! Shared functionality for the Trackify expense tracker:
//! - Database access, migrations and the audit log
//! - Per-user expense statistics
//! - Pluggable generative model backends (Gemini, Ollama, OpenAI-compatible)
//! - Prompt library for customizable AI prompts
//! - Insight adapter: insights, categorization and free-text answers

pub mod ai;
pub mod db;
pub mod error;
pub mod insights;
pub mod models;
pub mod prompts;
pub mod stats;

/// Test utilities including mock Gemini server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, GeminiBackend, MockBackend, MockReply, OllamaBackend,
    OpenAICompatibleBackend,
};
pub use db::{AuditEntry, Database};
pub use error::{Error, Result};
pub use insights::{InsightAdapter, InsightError};
pub use models::{
    AIInsight, Category, ExpenseRecord, ExpenseSummary, InsightKind, NewExpenseRecord, UserId,
};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary, PromptSource, RenderedPrompt};
pub use stats::{compute_user_stats, RecordStore, StatsError, StatsOutcome, UserStats};
