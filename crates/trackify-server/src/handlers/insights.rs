//! AI insight handlers
//!
//! All three endpoints answer 200 with a usable value even when the model
//! misbehaves; the adapter substitutes fallbacks. They only fail when no AI
//! backend is configured or no identity is present.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, CurrentUser};
use trackify_core::{AIInsight, Category, InsightAdapter};

fn adapter(state: &AppState) -> Result<&InsightAdapter, AppError> {
    state.insights.as_ref().ok_or_else(|| {
        AppError::service_unavailable("AI backend not configured. Set GEMINI_API_KEY to enable.")
    })
}

#[derive(Serialize)]
pub struct InsightsResponse {
    pub insights: Vec<AIInsight>,
}

/// POST /api/insights - Generate insights over the current user's records
pub async fn generate_insights(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<InsightsResponse>, AppError> {
    let user = current.require()?;
    let insights = adapter(&state)?;

    let records = state.db.list_records_for_user(user)?;
    let generated = insights.generate_insights(&records).await;

    state.db.log_audit(
        user.as_str(),
        "generate",
        Some("insights"),
        None,
        Some(&format!(
            "records={}, insights={}",
            records.len(),
            generated.len()
        )),
    )?;

    Ok(Json(InsightsResponse {
        insights: generated,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CategorizeRequest {
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize)]
pub struct CategorizeResponse {
    pub category: Category,
}

/// POST /api/insights/categorize - Suggest a category for a description
pub async fn categorize_expense(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CategorizeRequest>,
) -> Result<Json<CategorizeResponse>, AppError> {
    let user = current.require()?;
    let insights = adapter(&state)?;

    let category = insights.categorize_expense(&body.description).await;

    state.db.log_audit(
        user.as_str(),
        "categorize",
        Some("insights"),
        None,
        Some(&format!("category={}", category)),
    )?;

    Ok(Json(CategorizeResponse { category }))
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// POST /api/insights/ask - Answer a question about the current user's records
pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let user = current.require()?;
    let insights = adapter(&state)?;

    let question = body.question.trim();
    if question.is_empty() {
        return Err(AppError::bad_request("Question must not be empty"));
    }

    let records = state.db.list_records_for_user(user)?;
    let answer = insights.generate_answer(question, &records).await;

    state.db.log_audit(
        user.as_str(),
        "ask",
        Some("insights"),
        None,
        Some(&format!("records={}, question_len={}", records.len(), question.len())),
    )?;

    Ok(Json(AskResponse { answer }))
}
