//! Expense record and stats command implementations

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use trackify_core::{
    compute_user_stats, Category, Database, InsightAdapter, NewExpenseRecord, StatsOutcome, UserId,
};

use super::truncate;

pub fn cmd_records_list(db: &Database, user: &UserId, limit: usize) -> Result<()> {
    let total = db.count_records_for_user(user)?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let records = db.list_recent_records_for_user(user, limit)?;

    if records.is_empty() {
        println!("No records for {}.", user);
        println!("Add one with: trackify records add 12.50 -d \"Lunch\"");
        return Ok(());
    }

    println!(
        "{:<36}  {:<10}  {:>10}  {:<14}  {}",
        "ID", "DATE", "AMOUNT", "CATEGORY", "DESCRIPTION"
    );
    println!("{}", "-".repeat(100));

    for record in &records {
        println!(
            "{:<36}  {:<10}  {:>10.2}  {:<14}  {}",
            record.id,
            record.date.format("%Y-%m-%d"),
            record.amount,
            truncate(&record.category, 14),
            truncate(&record.description, 30)
        );
    }

    println!();
    println!("Showing {} of {} records", records.len(), total);

    Ok(())
}

/// Parse a `YYYY-MM-DD` date as midnight UTC
fn parse_date(date: &str) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD", date))?;
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .with_context(|| format!("Invalid date '{}'", date))
}

/// Add a record; without a category the description is categorized by the
/// AI backend when one is configured, otherwise the record is filed as Other
pub async fn cmd_records_add(
    db: &Database,
    user: &UserId,
    amount: f64,
    description: &str,
    category: Option<&str>,
    date: Option<&str>,
    insights: Option<&InsightAdapter>,
) -> Result<()> {
    if !amount.is_finite() {
        bail!("Amount must be a finite number");
    }

    let category = match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(label) => label
            .parse::<Category>()
            .map_err(|e| anyhow::anyhow!(e))?,
        None => match insights {
            Some(adapter) if !description.trim().is_empty() => {
                let suggested = adapter.categorize_expense(description).await;
                debug!(description, category = %suggested, "Auto-categorized expense");
                println!("🤖 Categorized as {}", suggested);
                suggested
            }
            _ => Category::Other,
        },
    };

    let date = match date {
        Some(d) => parse_date(d)?,
        None => Utc::now(),
    };

    let record = db.insert_record(
        user,
        &NewExpenseRecord {
            amount,
            category: category.to_string(),
            description: description.to_string(),
            date,
        },
    )?;

    db.log_audit(
        user.as_str(),
        "create",
        Some("record"),
        Some(&record.id),
        Some("source=cli"),
    )?;

    println!(
        "✅ Added {:.2} ({}) on {}",
        record.amount,
        record.category,
        record.date.format("%Y-%m-%d")
    );
    println!("   ID: {}", record.id);

    Ok(())
}

pub fn cmd_records_delete(db: &Database, user: &UserId, id: &str) -> Result<()> {
    db.delete_record(user, id)
        .with_context(|| format!("Failed to delete record {}", id))?;
    db.log_audit(
        user.as_str(),
        "delete",
        Some("record"),
        Some(id),
        Some("source=cli"),
    )?;
    println!("🗑️  Deleted record {}", id);
    Ok(())
}

pub fn cmd_stats(db: &Database, user: &UserId) -> Result<()> {
    match compute_user_stats(Some(user), db) {
        StatsOutcome::Stats(stats) => {
            println!("📊 Stats for {}", user);
            println!();
            println!("   Total amount:       ${:.2}", stats.total_amount);
            println!("   Days with expenses: {}", stats.days_with_records);
            Ok(())
        }
        StatsOutcome::Error { error } => bail!("Could not compute stats: {}", error),
    }
}
