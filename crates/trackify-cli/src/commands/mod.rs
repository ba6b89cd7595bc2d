//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `ai` - Insights, categorization, questions, backend health and prompts
//! - `core` - Init and shared utilities (open_db)
//! - `records` - Expense record commands (list, add, delete) and stats
//! - `serve` - Web server command

pub mod ai;
pub mod core;
pub mod records;
pub mod serve;

pub use ai::*;
pub use core::*;
pub use records::*;
pub use serve::*;

/// Truncate a string for table output, respecting char boundaries
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
