//! Expense record handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, CurrentUser, SuccessResponse, MAX_PAGE_LIMIT};
use trackify_core::{Category, ExpenseRecord, NewExpenseRecord};

/// Query parameters for listing records
#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Serialize)]
pub struct RecordListResponse {
    pub records: Vec<ExpenseRecord>,
    pub total: i64,
    pub limit: i64,
}

/// GET /api/records - List the current user's records, newest first
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<RecordQuery>,
) -> Result<Json<RecordListResponse>, AppError> {
    let user = current.require()?;
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);

    let total = state.db.count_records_for_user(user)?;
    let records = state.db.list_recent_records_for_user(user, limit)?;

    state.db.log_audit(
        user.as_str(),
        "list",
        Some("record"),
        None,
        Some(&format!("limit={}, total={}", limit, total)),
    )?;

    Ok(Json(RecordListResponse {
        records,
        total,
        limit,
    }))
}

/// Body for creating a record
#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub amount: f64,
    /// Category label; when missing or blank the record is auto-categorized
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Defaults to now
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// POST /api/records - Create a record for the current user
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreateRecordRequest>,
) -> Result<Json<ExpenseRecord>, AppError> {
    let user = current.require()?;

    if !body.amount.is_finite() {
        return Err(AppError::bad_request("Amount must be a finite number"));
    }

    let requested = body
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let (category, source) = match requested {
        Some(label) => {
            let category = label
                .parse::<Category>()
                .map_err(|e| AppError::bad_request(&e))?;
            (category, "user")
        }
        None => match state.insights {
            Some(ref insights) => (insights.categorize_expense(&body.description).await, "ai"),
            None => (Category::Other, "default"),
        },
    };

    let record = state.db.insert_record(
        user,
        &NewExpenseRecord {
            amount: body.amount,
            category: category.to_string(),
            description: body.description,
            date: body.date.unwrap_or_else(Utc::now),
        },
    )?;

    state.db.log_audit(
        user.as_str(),
        "create",
        Some("record"),
        Some(&record.id),
        Some(&format!(
            "amount={:.2}, category={}, source={}",
            record.amount, record.category, source
        )),
    )?;

    Ok(Json(record))
}

/// GET /api/records/:id - Get one of the current user's records
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ExpenseRecord>, AppError> {
    let user = current.require()?;

    let record = state
        .db
        .get_record(user, &id)?
        .ok_or_else(|| AppError::not_found("Record not found"))?;

    state
        .db
        .log_audit(user.as_str(), "view", Some("record"), Some(&id), None)?;

    Ok(Json(record))
}

/// DELETE /api/records/:id - Delete one of the current user's records
pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current.require()?;

    match state.db.delete_record(user, &id) {
        Ok(()) => {}
        Err(trackify_core::Error::NotFound(_)) => {
            return Err(AppError::not_found("Record not found"))
        }
        Err(e) => return Err(e.into()),
    }

    state
        .db
        .log_audit(user.as_str(), "delete", Some("record"), Some(&id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
