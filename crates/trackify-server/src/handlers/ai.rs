//! AI backend health handler

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::{AppError, AppState, CurrentUser};
use trackify_core::AIBackend;

#[derive(Serialize)]
pub struct AiHealthResponse {
    pub configured: bool,
    pub available: bool,
    pub backend: Option<&'static str>,
    pub model: Option<String>,
    pub host: Option<String>,
}

/// GET /api/ai/health - Live health check of the configured AI backend
pub async fn ai_health(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<AiHealthResponse>, AppError> {
    let user = current.require()?;

    let health = match state.insights {
        Some(ref insights) => {
            let client = insights.client();
            AiHealthResponse {
                configured: true,
                available: insights.health_check().await,
                backend: Some(client.kind()),
                model: Some(client.model().to_string()),
                host: Some(client.host().to_string()),
            }
        }
        None => AiHealthResponse {
            configured: false,
            available: false,
            backend: None,
            model: None,
            host: None,
        },
    };

    state.db.log_audit(
        user.as_str(),
        "health",
        Some("ai"),
        None,
        Some(&format!(
            "configured={}, available={}",
            health.configured, health.available
        )),
    )?;

    Ok(Json(health))
}
