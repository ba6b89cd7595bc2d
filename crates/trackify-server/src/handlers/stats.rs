//! Dashboard statistics handler

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::warn;

use crate::{AppState, CurrentUser};
use trackify_core::{compute_user_stats, StatsError, StatsOutcome};

/// GET /api/stats - Total amount and active days for the current user
///
/// The body is always the stats outcome: either the numbers or `{"error": ..}`.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> (StatusCode, Json<StatsOutcome>) {
    let outcome = compute_user_stats(current.user.as_ref(), &state.db);

    let status = match outcome {
        StatsOutcome::Stats(stats) => {
            if let Err(e) = state.db.log_audit(
                current.audit_name(),
                "view",
                Some("stats"),
                None,
                Some(&format!(
                    "total={:.2}, days={}",
                    stats.total_amount, stats.days_with_records
                )),
            ) {
                warn!(error = %e, "Failed to write audit log");
            }
            StatusCode::OK
        }
        StatsOutcome::Error {
            error: StatsError::Unauthenticated,
        } => StatusCode::UNAUTHORIZED,
        StatsOutcome::Error {
            error: StatsError::StoreFailure,
        } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(outcome))
}
