//! Domain models for Trackify

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identity of an authenticated user
///
/// Produced by the identity resolver (proxy header or API key); the core never
/// inspects its contents beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A recorded expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: String,
    pub user_id: UserId,
    /// Signed amount in currency units (negative values are refunds)
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ExpenseRecord {
    /// The view of this record sent to the generative model (no ids)
    pub fn summary(&self) -> ExpenseSummary {
        ExpenseSummary {
            amount: self.amount,
            category: self.category.clone(),
            description: self.description.clone(),
            date: self.date,
        }
    }
}

/// A new expense to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpenseRecord {
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: DateTime<Utc>,
}

/// Expense fields embedded in prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: DateTime<Utc>,
}

/// The closed set of expense categories the model may assign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transportation,
    Entertainment,
    Shopping,
    Bills,
    Healthcare,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transportation => "Transportation",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Bills => "Bills",
            Self::Healthcare => "Healthcare",
            Self::Other => "Other",
        }
    }

    pub fn all() -> &'static [Category] {
        &[
            Self::Food,
            Self::Transportation,
            Self::Entertainment,
            Self::Shopping,
            Self::Bills,
            Self::Healthcare,
            Self::Other,
        ]
    }

    /// Exact, case-sensitive label match (used for model output)
    pub fn from_label(label: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.as_str() == label)
    }

    /// Comma-separated label list for prompts
    pub fn label_list() -> String {
        Self::all()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    /// Lenient parse for user input (case-insensitive)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of AI insight, used by the UI for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Warning,
    #[default]
    Info,
    Success,
    Tip,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Success => "success",
            Self::Tip => "tip",
        }
    }
}

impl std::str::FromStr for InsightKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "tip" => Ok(Self::Tip),
            _ => Err(format!("Unknown insight type: {}", s)),
        }
    }
}

impl std::fmt::Display for InsightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A generated financial insight (never persisted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIInsight {
    /// Unique per generated insight, not stable across calls
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// In [0, 1]
    pub confidence: f64,
}
