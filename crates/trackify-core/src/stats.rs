//! Per-user expense statistics
//!
//! Computes the dashboard numbers for one identity: the total amount across
//! all of its records and the number of distinct UTC calendar days that hold
//! at least one positive-amount record. Refunds and zero-amount records count
//! toward the total but never toward the day count.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use tracing::error;

use crate::error::Result;
use crate::models::{ExpenseRecord, UserId};

/// Source of expense records keyed by owner
pub trait RecordStore {
    /// All records owned by `owner` (a single read-only query)
    fn records_for_owner(&self, owner: &UserId) -> Result<Vec<ExpenseRecord>>;
}

/// Aggregate numbers for one user
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_amount: f64,
    pub days_with_records: usize,
}

/// Why stats could not be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("User not found")]
    Unauthenticated,
    #[error("Database error")]
    StoreFailure,
}

impl Serialize for StatsError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Either stats or an error, never both
///
/// Serializes to `{"totalAmount": .., "daysWithRecords": ..}` or `{"error": ".."}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatsOutcome {
    Stats(UserStats),
    Error { error: StatsError },
}

impl StatsOutcome {
    pub fn into_result(self) -> std::result::Result<UserStats, StatsError> {
        match self {
            Self::Stats(stats) => Ok(stats),
            Self::Error { error } => Err(error),
        }
    }
}

impl From<std::result::Result<UserStats, StatsError>> for StatsOutcome {
    fn from(result: std::result::Result<UserStats, StatsError>) -> Self {
        match result {
            Ok(stats) => Self::Stats(stats),
            Err(error) => Self::Error { error },
        }
    }
}

/// UTC calendar day of a record
pub fn utc_day(record: &ExpenseRecord) -> NaiveDate {
    record.date.date_naive()
}

/// Reduce a record set to its stats
pub fn summarize(records: &[ExpenseRecord]) -> UserStats {
    let total_amount = records.iter().map(|r| r.amount).sum();

    let days: HashSet<NaiveDate> = records
        .iter()
        .filter(|r| r.amount > 0.0)
        .map(utc_day)
        .collect();

    UserStats {
        total_amount,
        days_with_records: days.len(),
    }
}

/// Compute stats for the current identity
///
/// Without an identity the store is never touched. Store failures are logged
/// and reported as `StatsError::StoreFailure`.
pub fn compute_user_stats<S>(identity: Option<&UserId>, store: &S) -> StatsOutcome
where
    S: RecordStore + ?Sized,
{
    let Some(user) = identity else {
        return StatsOutcome::Error {
            error: StatsError::Unauthenticated,
        };
    };

    match store.records_for_owner(user) {
        Ok(records) => StatsOutcome::Stats(summarize(&records)),
        Err(e) => {
            error!(user = %user, error = %e, "Error fetching user records");
            StatsOutcome::Error {
                error: StatsError::StoreFailure,
            }
        }
    }
}
