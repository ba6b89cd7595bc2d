//! Trackify Web Server
//!
//! Axum-based REST API and root page for the Trackify expense tracker.
//!
//! Security features:
//! - Cloudflare Access identity header or per-user API keys (use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Audit logging for all API access (reads and writes)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use trackify_core::{AIBackend, AIClient, Database, InsightAdapter, UserId};

mod handlers;
mod pages;

/// Maximum number of records returned by one list call
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Cloudflare Access header for authenticated user email
const CF_ACCESS_USER_HEADER: &str = "cf-access-authenticated-user-email";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Identity used for requests when authentication is disabled
pub const LOCAL_DEV_USER: &str = "local-dev";

/// Identity used for bare API keys without an owner prefix
pub const DEFAULT_API_KEY_USER: &str = "api-key";

/// An API key and the identity it authenticates as
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey {
    pub user: String,
    pub key: String,
}

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// API keys for scripted access (alternative to Cloudflare Access)
    /// Format: "Bearer <key>" in Authorization header
    pub api_keys: Vec<ApiKey>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Insight adapter, present when an AI backend is configured
    pub insights: Option<InsightAdapter>,
}

/// How the current request was identified
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    CloudflareHeader,
    ApiKey,
    /// Authentication disabled
    None,
    /// No identity could be resolved
    Anonymous,
}

/// Identity resolved by the auth middleware, available to every handler
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: Option<UserId>,
    pub method: AuthMethod,
}

impl CurrentUser {
    /// The identity, or a 401 for handlers that need one
    pub fn require(&self) -> Result<&UserId, AppError> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }

    /// Audit-log actor name
    pub fn audit_name(&self) -> &str {
        self.user.as_ref().map(UserId::as_str).unwrap_or("anonymous")
    }
}

/// Identity middleware
///
/// Never rejects: it records who the caller is (if anyone) as a `CurrentUser`
/// extension. Handlers that need an identity answer 401 themselves, and the
/// root page shows the guest view instead.
///
/// # Security Notes
///
/// **Cloudflare Access header**: `CF-Access-Authenticated-User-Email` is safe
/// behind Cloudflare Tunnel (which strips/rewrites CF headers), but can be
/// spoofed if the server is exposed directly to the internet.
///
/// **API keys**: Compared using constant-time comparison to prevent timing attacks.
async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let current = resolve_identity(request.headers(), &state.config);

    match (&current.user, current.method) {
        (Some(user), method) => {
            debug!(user = %user, ?method, path = %request.uri().path(), "Resolved identity")
        }
        (None, _) => {
            debug!(path = %request.uri().path(), "No identity for request")
        }
    }

    request.extensions_mut().insert(current);
    next.run(request).await
}

/// Resolve the caller's identity from request headers
pub fn resolve_identity(headers: &HeaderMap, config: &ServerConfig) -> CurrentUser {
    let cf_user = headers
        .get(CF_ACCESS_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());

    if let Some(email) = cf_user {
        return CurrentUser {
            user: Some(UserId::new(email)),
            method: AuthMethod::CloudflareHeader,
        };
    }

    let bearer = headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "));

    if let Some(key) = bearer.and_then(|key| validate_api_key(key, &config.api_keys)) {
        return CurrentUser {
            user: Some(UserId::new(key.user.as_str())),
            method: AuthMethod::ApiKey,
        };
    }

    if bearer.is_some() {
        warn!("Rejected invalid API key");
    }

    if !config.require_auth {
        return CurrentUser {
            user: Some(UserId::new(LOCAL_DEV_USER)),
            method: AuthMethod::None,
        };
    }

    CurrentUser {
        user: None,
        method: AuthMethod::Anonymous,
    }
}

/// Find the configured key matching `provided` using constant-time comparison
/// to prevent timing attacks.
fn validate_api_key<'a>(provided: &str, valid_keys: &'a [ApiKey]) -> Option<&'a ApiKey> {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    valid_keys.iter().find(|candidate| {
        let key_bytes = candidate.key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Parse a comma-separated list of API keys
///
/// Examples:
/// - "alice@example.com:k3y" - key owned by alice@example.com
/// - "k3y" - bare key, identity "api-key"
/// - "alice@example.com:k1,bob@example.com:k2" - multiple keys
pub fn parse_api_keys(input: &str) -> Vec<ApiKey> {
    input
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            let (user, key) = match entry.rsplit_once(':') {
                Some((user, key)) if !user.trim().is_empty() => (user.trim(), key.trim()),
                Some((_, key)) => (DEFAULT_API_KEY_USER, key.trim()),
                None => (DEFAULT_API_KEY_USER, entry),
            };
            if key.is_empty() {
                warn!(user, "Ignoring API key entry with empty key");
                return None;
            }
            Some(ApiKey {
                user: user.to_string(),
                key: key.to_string(),
            })
        })
        .collect()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router around an optional AI client
pub fn create_router_with_options(
    db: Database,
    static_dir: Option<&str>,
    config: ServerConfig,
    ai: Option<AIClient>,
) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        insights: ai.map(InsightAdapter::new),
    });

    let api_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // Stats
        .route("/stats", get(handlers::get_stats))
        // Records
        .route(
            "/records",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/records/:id",
            get(handlers::get_record).delete(handlers::delete_record),
        )
        // Insights
        .route("/insights", post(handlers::generate_insights))
        .route("/insights/categorize", post(handlers::categorize_expense))
        .route("/insights/ask", post(handlers::ask_question))
        // AI backend
        .route("/ai/health", get(handlers::ai_health));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    // CSP: no scripts at all, inline styles allowed for the layout shell
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'none'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; frame-ancestors 'none'",
    );

    let mut app = Router::new()
        .route("/", get(pages::index))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ))
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ))
}

/// Start the server
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }
    if config.require_auth && config.api_keys.is_empty() {
        info!("No API keys configured; only Cloudflare Access identities will be accepted");
    }

    let ai = AIClient::from_env();
    check_ai_connection(ai.as_ref()).await;

    let app = create_router_with_options(db, static_dir, config, ai);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log AI backend connection status; true when a backend answered
async fn check_ai_connection(ai: Option<&AIClient>) -> bool {
    let Some(client) = ai else {
        info!("ℹ️  AI backend not configured (set GEMINI_API_KEY to enable AI insights)");
        return false;
    };

    let healthy = client.health_check().await;
    if healthy {
        info!(
            "✅ AI backend connected: {} {} (model: {})",
            client.kind(),
            client.host(),
            client.model()
        );
    } else {
        warn!(
            "⚠️  AI backend configured but not responding: {} (model: {})",
            client.host(),
            client.model()
        );
    }
    healthy
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
