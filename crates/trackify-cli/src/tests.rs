//! CLI command tests

use trackify_core::{
    AIClient, Database, InsightAdapter, MockBackend, MockReply, NewExpenseRecord, UserId,
};

use crate::commands;

fn setup_test_db() -> Database {
    Database::in_memory().expect("Failed to create test database")
}

fn mock_adapter() -> InsightAdapter {
    InsightAdapter::new(AIClient::Mock(MockBackend::new()))
}

fn alice() -> UserId {
    UserId::new("alice@example.com")
}

#[test]
fn test_truncate() {
    assert_eq!(commands::truncate("short", 10), "short");
    assert_eq!(commands::truncate("exactly ten", 11), "exactly ten");
    assert_eq!(commands::truncate("a long description", 10), "a long ...");
    // Multi-byte characters are never split
    assert_eq!(commands::truncate("café au lait", 7), "café...");
}

#[test]
fn test_cmd_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("init.db");

    commands::cmd_init(&path, true).unwrap();

    assert!(path.exists());
    let db = commands::open_db(&path, true).unwrap();
    assert_eq!(db.count_records_for_user(&alice()).unwrap(), 0);
}

#[tokio::test]
async fn test_cmd_records_add_with_category() {
    let db = setup_test_db();

    commands::cmd_records_add(
        &db,
        &alice(),
        12.5,
        "Lunch",
        Some("food"),
        Some("2024-03-01"),
        None,
    )
    .await
    .unwrap();

    let records = db.list_records_for_user(&alice()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].category, "Food");
    assert_eq!(records[0].description, "Lunch");
    assert_eq!(records[0].date.format("%Y-%m-%d").to_string(), "2024-03-01");

    let audit = db.list_audit_log(10).unwrap();
    assert!(audit
        .iter()
        .any(|e| e.action == "create" && e.user_id == "alice@example.com"));
}

#[tokio::test]
async fn test_cmd_records_add_auto_categorizes() {
    let db = setup_test_db();
    let adapter = mock_adapter();

    commands::cmd_records_add(&db, &alice(), 18.0, "Pizza night", None, None, Some(&adapter))
        .await
        .unwrap();

    let records = db.list_records_for_user(&alice()).unwrap();
    assert_eq!(records[0].category, "Food");
}

#[tokio::test]
async fn test_cmd_records_add_without_ai_defaults_to_other() {
    let db = setup_test_db();

    commands::cmd_records_add(&db, &alice(), 5.0, "Mystery", None, None, None)
        .await
        .unwrap();

    let records = db.list_records_for_user(&alice()).unwrap();
    assert_eq!(records[0].category, "Other");
}

#[tokio::test]
async fn test_cmd_records_add_rejects_bad_input() {
    let db = setup_test_db();

    let bad_category =
        commands::cmd_records_add(&db, &alice(), 5.0, "x", Some("Groceries"), None, None).await;
    assert!(bad_category.is_err());

    let bad_date =
        commands::cmd_records_add(&db, &alice(), 5.0, "x", Some("Food"), Some("03/01/2024"), None)
            .await;
    assert!(bad_date.is_err());

    let bad_amount =
        commands::cmd_records_add(&db, &alice(), f64::NAN, "x", Some("Food"), None, None).await;
    assert!(bad_amount.is_err());

    assert_eq!(db.count_records_for_user(&alice()).unwrap(), 0);
}

#[test]
fn test_cmd_records_delete_is_owner_scoped() {
    let db = setup_test_db();
    let record = db
        .insert_record(
            &alice(),
            &NewExpenseRecord {
                amount: 9.0,
                category: "Bills".into(),
                description: "Phone".into(),
                date: chrono::Utc::now(),
            },
        )
        .unwrap();

    let bob = UserId::new("bob@example.com");
    assert!(commands::cmd_records_delete(&db, &bob, &record.id).is_err());
    assert_eq!(db.count_records_for_user(&alice()).unwrap(), 1);

    commands::cmd_records_delete(&db, &alice(), &record.id).unwrap();
    assert_eq!(db.count_records_for_user(&alice()).unwrap(), 0);
}

#[test]
fn test_cmd_records_list_and_stats() {
    let db = setup_test_db();
    assert!(commands::cmd_records_list(&db, &alice(), 20).is_ok());
    assert!(commands::cmd_stats(&db, &alice()).is_ok());

    db.insert_record(
        &alice(),
        &NewExpenseRecord {
            amount: 40.0,
            category: "Shopping".into(),
            description: "Shoes".into(),
            date: chrono::Utc::now(),
        },
    )
    .unwrap();

    assert!(commands::cmd_records_list(&db, &alice(), 1).is_ok());
    assert!(commands::cmd_stats(&db, &alice()).is_ok());
}

#[tokio::test]
async fn test_cmd_insights_and_ask_with_mock() {
    let db = setup_test_db();
    let adapter = mock_adapter();

    assert!(commands::cmd_insights(&db, &alice(), &adapter, false)
        .await
        .is_ok());
    assert!(commands::cmd_insights(&db, &alice(), &adapter, true)
        .await
        .is_ok());
    assert!(commands::cmd_ask(&db, &alice(), &adapter, "Where does my money go?")
        .await
        .is_ok());
    assert!(commands::cmd_ask(&db, &alice(), &adapter, "   ").await.is_err());
}

#[tokio::test]
async fn test_cmd_categorize_survives_backend_failure() {
    let mock = MockBackend::with_replies([MockReply::Fail("quota exceeded".into())]);
    let adapter = InsightAdapter::new(AIClient::Mock(mock));

    assert!(commands::cmd_categorize(&adapter, "Uber to airport")
        .await
        .is_ok());
}

#[test]
fn test_cmd_prompts() {
    assert!(commands::cmd_prompts_list().is_ok());
    assert!(commands::cmd_prompts_show("categorize_expense").is_ok());
    assert!(commands::cmd_prompts_show("no_such_prompt").is_err());
}
