//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use trackify_core::{MockBackend, MockReply, NewExpenseRecord};

const ALICE: &str = "alice@example.com";
const BOB: &str = "bob@example.com";

fn secured_config() -> ServerConfig {
    ServerConfig {
        api_keys: parse_api_keys("bob@example.com:bob-secret-key"),
        ..ServerConfig::default()
    }
}

fn setup_app_with(db: Database, ai: Option<AIClient>) -> Router {
    create_router_with_options(db, None, secured_config(), ai)
}

fn setup_test_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let app = setup_app_with(db.clone(), Some(AIClient::mock()));
    (app, db)
}

fn seed(db: &Database, user: &str, amount: f64, category: &str, description: &str, day: u32) {
    use chrono::TimeZone;
    db.insert_record(
        &UserId::new(user),
        &NewExpenseRecord {
            amount,
            category: category.to_string(),
            description: description.to_string(),
            date: chrono::Utc
                .with_ymd_and_hms(2024, 6, day, 12, 0, 0)
                .unwrap(),
        },
    )
    .unwrap();
}

fn get_as(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(CF_ACCESS_USER_HEADER, user)
        .body(Body::empty())
        .unwrap()
}

fn post_json_as(uri: &str, user: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CF_ACCESS_USER_HEADER, user)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ========== Identity ==========

#[test]
fn test_parse_api_keys() {
    let keys = parse_api_keys("alice@example.com:k1, bare-key ,:k3,bob:");
    assert_eq!(
        keys,
        vec![
            ApiKey {
                user: "alice@example.com".into(),
                key: "k1".into()
            },
            ApiKey {
                user: DEFAULT_API_KEY_USER.into(),
                key: "bare-key".into()
            },
            ApiKey {
                user: DEFAULT_API_KEY_USER.into(),
                key: "k3".into()
            },
        ]
    );
    assert!(parse_api_keys("").is_empty());
}

#[test]
fn test_resolve_identity_precedence() {
    let config = secured_config();

    let mut headers = HeaderMap::new();
    assert_eq!(resolve_identity(&headers, &config).user, None);

    headers.insert(AUTHORIZATION_HEADER, "Bearer bob-secret-key".parse().unwrap());
    let current = resolve_identity(&headers, &config);
    assert_eq!(current.user, Some(UserId::new(BOB)));
    assert_eq!(current.method, AuthMethod::ApiKey);

    headers.insert(CF_ACCESS_USER_HEADER, ALICE.parse().unwrap());
    let current = resolve_identity(&headers, &config);
    assert_eq!(current.user, Some(UserId::new(ALICE)));
    assert_eq!(current.method, AuthMethod::CloudflareHeader);
}

#[test]
fn test_resolve_identity_rejects_wrong_key() {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION_HEADER, "Bearer bob-secret-kez".parse().unwrap());
    assert_eq!(resolve_identity(&headers, &secured_config()).user, None);
}

#[test]
fn test_resolve_identity_whitespace_header_is_anonymous() {
    let mut headers = HeaderMap::new();
    headers.insert(CF_ACCESS_USER_HEADER, "   ".parse().unwrap());
    let current = resolve_identity(&headers, &secured_config());
    assert_eq!(current.method, AuthMethod::Anonymous);
}

#[tokio::test]
async fn test_me_without_auth_is_local_dev() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = create_router_with_options(db, None, config, None);

    let response = app
        .oneshot(Request::builder().uri("/api/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"], LOCAL_DEV_USER);
    assert_eq!(json["auth_method"], "none");
}

#[tokio::test]
async fn test_me_with_api_key() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("authorization", "Bearer bob-secret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = get_body_json(response).await;
    assert_eq!(json["user"], BOB);
    assert_eq!(json["auth_method"], "api_key");
}

// ========== Stats ==========

#[tokio::test]
async fn test_stats_unauthenticated() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json, serde_json::json!({"error": "User not found"}));
}

#[tokio::test]
async fn test_stats_for_user() {
    let (app, db) = setup_test_app();
    seed(&db, ALICE, 100.0, "Food", "Groceries", 5);
    seed(&db, ALICE, -20.0, "Food", "Refund", 5);
    seed(&db, ALICE, 50.0, "Bills", "Phone", 6);
    seed(&db, BOB, 999.0, "Shopping", "Laptop", 7);

    let response = app.oneshot(get_as("/api/stats", ALICE)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["totalAmount"], 130.0);
    assert_eq!(json["daysWithRecords"], 2);
    assert!(json.get("error").is_none());

    let audit = db.list_audit_log(10).unwrap();
    assert!(audit
        .iter()
        .any(|e| e.user_id == ALICE && e.entity_type.as_deref() == Some("stats")));
}

#[tokio::test]
async fn test_stats_empty_user() {
    let (app, _) = setup_test_app();

    let response = app.oneshot(get_as("/api/stats", ALICE)).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["totalAmount"], 0.0);
    assert_eq!(json["daysWithRecords"], 0);
}

// ========== Records ==========

#[tokio::test]
async fn test_records_require_identity() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/api/records").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Authentication required");
}

#[tokio::test]
async fn test_create_record_with_category() {
    let (app, db) = setup_test_app();

    let response = app
        .oneshot(post_json_as(
            "/api/records",
            ALICE,
            serde_json::json!({
                "amount": 12.5,
                "category": "healthcare",
                "description": "Pharmacy",
                "date": "2024-06-01T10:00:00Z"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["category"], "Healthcare");
    assert_eq!(json["user_id"], ALICE);

    assert_eq!(db.count_records_for_user(&UserId::new(ALICE)).unwrap(), 1);
}

#[tokio::test]
async fn test_create_record_auto_categorizes() {
    let db = Database::in_memory().unwrap();
    let mock = MockBackend::with_replies([MockReply::Text("Transportation".into())]);
    let app = setup_app_with(db, Some(AIClient::Mock(mock.clone())));

    let response = app
        .oneshot(post_json_as(
            "/api/records",
            ALICE,
            serde_json::json!({"amount": 30.0, "description": "Uber to airport"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["category"], "Transportation");
    assert!(mock.prompts()[0].user.contains("Uber to airport"));
}

#[tokio::test]
async fn test_create_record_without_ai_defaults_to_other() {
    let db = Database::in_memory().unwrap();
    let app = setup_app_with(db, None);

    let response = app
        .oneshot(post_json_as(
            "/api/records",
            ALICE,
            serde_json::json!({"amount": 30.0, "description": "Something", "category": "  "}),
        ))
        .await
        .unwrap();

    let json = get_body_json(response).await;
    assert_eq!(json["category"], "Other");
}

#[tokio::test]
async fn test_create_record_unknown_category() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(post_json_as(
            "/api/records",
            ALICE,
            serde_json::json!({"amount": 1.0, "category": "Groceries"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_records_scoped_to_owner() {
    let (app, db) = setup_test_app();
    seed(&db, ALICE, 10.0, "Food", "Lunch", 1);
    seed(&db, BOB, 20.0, "Food", "Dinner", 2);
    let bob_record = db.list_records_for_user(&UserId::new(BOB)).unwrap()[0].clone();

    let response = app
        .clone()
        .oneshot(get_as("/api/records", ALICE))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["records"][0]["description"], "Lunch");

    let response = app
        .oneshot(get_as(&format!("/api/records/{}", bob_record.id), ALICE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_records_limit_default_and_clamp() {
    let (app, db) = setup_test_app();
    seed(&db, ALICE, 10.0, "Food", "Lunch", 1);
    seed(&db, ALICE, 50.0, "Bills", "Phone", 5);
    seed(&db, ALICE, 30.0, "Shopping", "Shoes", 3);
    seed(&db, BOB, 99.0, "Food", "Dinner", 7);

    let amounts = |json: &serde_json::Value| -> Vec<f64> {
        json["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["amount"].as_f64().unwrap())
            .collect()
    };

    let response = app
        .clone()
        .oneshot(get_as("/api/records", ALICE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["limit"], 100);
    assert_eq!(json["total"], 3);
    assert_eq!(amounts(&json), vec![50.0, 30.0, 10.0]);

    let response = app
        .clone()
        .oneshot(get_as("/api/records?limit=2", ALICE))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["limit"], 2);
    assert_eq!(json["total"], 3);
    assert_eq!(amounts(&json), vec![50.0, 30.0]);

    for (query, expected) in [("limit=0", 1), ("limit=-5", 1), ("limit=5000", 1000)] {
        let response = app
            .clone()
            .oneshot(get_as(&format!("/api/records?{}", query), ALICE))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = get_body_json(response).await;
        assert_eq!(json["limit"], expected, "{}", query);
        assert_eq!(json["total"], 3);
    }

    let response = app
        .oneshot(get_as("/api/records?limit=0", ALICE))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(amounts(&json), vec![50.0]);
}

#[tokio::test]
async fn test_delete_record() {
    let (app, db) = setup_test_app();
    seed(&db, ALICE, 10.0, "Food", "Lunch", 1);
    let record = db.list_records_for_user(&UserId::new(ALICE)).unwrap()[0].clone();

    let delete = |user: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/records/{}", record.id))
            .header(CF_ACCESS_USER_HEADER, user)
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(delete(BOB)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.clone().oneshot(delete(ALICE)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["success"], true);

    let response = app.oneshot(delete(ALICE)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Insights ==========

#[tokio::test]
async fn test_generate_insights() {
    let (app, db) = setup_test_app();
    seed(&db, ALICE, 45.0, "Food", "Restaurant", 3);

    let response = app
        .oneshot(post_json_as("/api/insights", ALICE, serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let insights = json["insights"].as_array().unwrap();
    assert!(!insights.is_empty());
    assert!(insights.iter().all(|i| i["id"].is_string() && i["type"].is_string()));
}

#[tokio::test]
async fn test_generate_insights_fallback_is_ok() {
    let db = Database::in_memory().unwrap();
    let mock = MockBackend::with_replies([MockReply::Fail("quota exceeded".into())]);
    let app = setup_app_with(db, Some(AIClient::Mock(mock)));

    let response = app
        .oneshot(post_json_as("/api/insights", ALICE, serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["insights"].as_array().unwrap().len(), 1);
    assert_eq!(json["insights"][0]["title"], "Insights Unavailable");
    assert_eq!(json["insights"][0]["confidence"], 0.5);
}

#[tokio::test]
async fn test_insights_without_backend() {
    let db = Database::in_memory().unwrap();
    let app = setup_app_with(db, None);

    let response = app
        .oneshot(post_json_as("/api/insights", ALICE, serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_categorize_endpoint() {
    let db = Database::in_memory().unwrap();
    let mock = MockBackend::with_replies([MockReply::Text("Not a label".into())]);
    let app = setup_app_with(db, Some(AIClient::Mock(mock)));

    let response = app
        .oneshot(post_json_as(
            "/api/insights/categorize",
            ALICE,
            serde_json::json!({"description": "Mystery charge"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["category"], "Other");
}

#[tokio::test]
async fn test_ask_endpoint() {
    let db = Database::in_memory().unwrap();
    seed(&db, ALICE, 45.0, "Food", "Restaurant", 3);
    let mock = MockBackend::with_replies([MockReply::Text(" Eat out less. ".into())]);
    let app = setup_app_with(db, Some(AIClient::Mock(mock.clone())));

    let response = app
        .clone()
        .oneshot(post_json_as(
            "/api/insights/ask",
            ALICE,
            serde_json::json!({"question": "How can I save?"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["answer"], "Eat out less.");
    assert!(mock.prompts()[0].user.contains("Restaurant"));

    let response = app
        .oneshot(post_json_as(
            "/api/insights/ask",
            ALICE,
            serde_json::json!({"question": "   "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ai_health() {
    let (app, _) = setup_test_app();

    let response = app.oneshot(get_as("/api/ai/health", ALICE)).await.unwrap();

    let json = get_body_json(response).await;
    assert_eq!(json["configured"], true);
    assert_eq!(json["available"], true);
    assert_eq!(json["backend"], "mock");
}

#[tokio::test]
async fn test_ai_health_unconfigured() {
    let db = Database::in_memory().unwrap();
    let app = setup_app_with(db, None);

    let response = app.oneshot(get_as("/api/ai/health", ALICE)).await.unwrap();

    let json = get_body_json(response).await;
    assert_eq!(json["configured"], false);
    assert!(json["backend"].is_null());
}

#[tokio::test]
async fn test_check_ai_connection_uses_given_client() {
    assert!(check_ai_connection(Some(&AIClient::mock())).await);
    assert!(!check_ai_connection(Some(&AIClient::Mock(MockBackend::unhealthy()))).await);
    assert!(!check_ai_connection(None).await);
}

// ========== Root page ==========

#[tokio::test]
async fn test_root_page_guest() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-frame-options").unwrap(),
        "DENY"
    );
    let page = get_body_text(response).await;
    assert!(page.contains("<title>Trackify AI - Smart Financial Management</title>"));
    assert!(page.contains("Welcome to Trackify AI"));
}

#[tokio::test]
async fn test_root_page_home() {
    let (app, db) = setup_test_app();
    seed(&db, ALICE, 42.0, "Food", "Lunch", 4);

    let response = app.oneshot(get_as("/", ALICE)).await.unwrap();

    let page = get_body_text(response).await;
    assert!(page.contains("Welcome back, alice@example.com"));
    assert!(page.contains("$42.00"));
    assert!(!page.contains("Welcome to Trackify AI"));
}
