//! Expense record operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_timestamp, Database};
use crate::error::{Error, Result};
use crate::models::{ExpenseRecord, NewExpenseRecord, UserId};
use crate::stats::RecordStore;

const RECORD_COLUMNS: &str = "id, user_id, amount, category, description, date, created_at";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ExpenseRecord> {
    let user_id: String = row.get(1)?;
    let date: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(ExpenseRecord {
        id: row.get(0)?,
        user_id: UserId::new(user_id),
        amount: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        date: parse_timestamp(&date)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

impl Database {
    /// Insert a new expense record owned by `owner`, returning the stored row
    pub fn insert_record(&self, owner: &UserId, record: &NewExpenseRecord) -> Result<ExpenseRecord> {
        if !record.amount.is_finite() {
            return Err(Error::InvalidData(format!(
                "Amount must be a finite number, got {}",
                record.amount
            )));
        }

        let conn = self.conn()?;
        let stored = ExpenseRecord {
            id: Uuid::new_v4().to_string(),
            user_id: owner.clone(),
            amount: record.amount,
            category: record.category.trim().to_string(),
            description: record.description.trim().to_string(),
            date: record.date,
            created_at: Utc::now(),
        };

        conn.execute(
            r#"
            INSERT INTO records (id, user_id, amount, category, description, date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                stored.id,
                stored.user_id.as_str(),
                stored.amount,
                stored.category,
                stored.description,
                stored.date.to_rfc3339(),
                stored.created_at.to_rfc3339(),
            ],
        )?;

        Ok(stored)
    }

    /// Get a record by id, scoped to its owner
    pub fn get_record(&self, owner: &UserId, id: &str) -> Result<Option<ExpenseRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM records WHERE id = ? AND user_id = ?",
                    RECORD_COLUMNS
                ),
                params![id, owner.as_str()],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// List all records owned by `owner`, newest first
    pub fn list_records_for_user(&self, owner: &UserId) -> Result<Vec<ExpenseRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM records WHERE user_id = ? ORDER BY date DESC, created_at DESC",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![owner.as_str()], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// The `limit` most recent records owned by `owner`, newest first
    pub fn list_recent_records_for_user(
        &self,
        owner: &UserId,
        limit: i64,
    ) -> Result<Vec<ExpenseRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM records WHERE user_id = ?
             ORDER BY date DESC, created_at DESC LIMIT ?",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![owner.as_str(), limit], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Delete a record owned by `owner`
    ///
    /// Returns `NotFound` if no such record exists for that owner.
    pub fn delete_record(&self, owner: &UserId, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM records WHERE id = ? AND user_id = ?",
            params![id, owner.as_str()],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Record {}", id)));
        }
        Ok(())
    }

    /// Count records owned by `owner`
    pub fn count_records_for_user(&self, owner: &UserId) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE user_id = ?",
            params![owner.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl RecordStore for Database {
    fn records_for_owner(&self, owner: &UserId) -> Result<Vec<ExpenseRecord>> {
        self.list_records_for_user(owner)
    }
}
