//! Authentication-related handlers

use axum::{Extension, Json};
use serde::Serialize;

use crate::{AuthMethod, CurrentUser};

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    /// The authenticated user's email or identifier (null when anonymous)
    pub user: Option<String>,
    /// How the user was authenticated
    pub auth_method: AuthMethod,
}

/// GET /api/me - Get the currently authenticated user
pub async fn get_me(Extension(current): Extension<CurrentUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user: current.user.as_ref().map(|u| u.to_string()),
        auth_method: current.method,
    })
}
