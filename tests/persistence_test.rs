mod common;

use anyhow::Result;
use common::{FlakyStore, USER, parse_date, reopen, test_service};
use tallybook::application::{AppError, SyncStatus, TrackerService};
use tallybook::domain::TransactionKind;
use tallybook::storage::DocumentStore;

#[tokio::test]
async fn test_legacy_document_is_decoded_on_load() -> Result<()> {
    let (service, temp) = test_service().await?;

    // Older clients stored array fields as JSON strings and amounts as text
    let legacy = r#"{
        "myBills": "[{\"id\":1700000000000,\"name\":\"Rent\",\"amount\":\"1200.50\",\"dueDate\":\"2024-01-01T00:00:00.000Z\",\"type\":\"expense\",\"paid\":true},{\"id\":\"oops\",\"name\":\"Water\",\"amount\":30,\"dueDay\":12}]",
        "myBalance": "500",
        "myCleanedDays": "[\"2024-01-02\",\"2024-01-03\"]",
        "mySavings": "not json at all"
    }"#;
    sqlx::query("INSERT INTO documents (user_id, body, updated_at) VALUES (?, ?, ?)")
        .bind(USER)
        .bind(legacy)
        .bind("2024-01-01T00:00:00Z")
        .execute(service.store().pool())
        .await?;
    drop(service);

    let service = reopen(&temp).await?;
    let ledger = service.ledger();
    assert_eq!(ledger.initial_balance(), 50000);
    assert_eq!(ledger.cleaned_days().len(), 2);
    assert!(ledger.savings().is_empty());

    let transactions = service.ordered_transactions();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].amount, 120050);
    assert_eq!(transactions[0].due_date, Some(parse_date("2024-01-01")));
    assert!(transactions[0].paid);
    assert_eq!(transactions[1].due_label(), "Day 12");
    assert_eq!(transactions[1].kind, TransactionKind::Expense);
    assert_ne!(transactions[1].id, transactions[0].id);

    assert_eq!(service.totals().projected_balance, 50000 - 120050 - 3000);
    Ok(())
}

#[tokio::test]
async fn test_each_user_has_their_own_document() -> Result<()> {
    let (mut service, temp) = test_service().await?;
    service.set_initial_balance(1000).await;

    let other = TrackerService::open(
        tallybook::SqliteStore::open(temp.path().join("test.db").to_str().unwrap()).await?,
        "someone-else",
    )
    .await;
    assert!(other.ledger().is_empty());
    assert_eq!(other.ledger().initial_balance(), 0);

    let users = service.store().list_users().await?;
    assert_eq!(users, vec![USER.to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_write_failure_keeps_state_in_memory() -> Result<()> {
    let mut service = TrackerService::open(FlakyStore::failing_writes(), USER).await;

    let outcome = service
        .add_transaction("Rent", 120000, Some(parse_date("2024-01-01")), TransactionKind::Expense)
        .await?;
    assert!(outcome.is_applied());
    assert!(!outcome.is_synced());
    assert!(matches!(&outcome.sync, SyncStatus::Failed(reason) if reason.contains("disk full")));

    // The command took effect even though it was not saved
    assert_eq!(service.ledger().transactions().len(), 1);
    assert_eq!(service.totals().total_expenses, 120000);

    let outcome = service.set_initial_balance(700).await;
    assert!(!outcome.is_synced());
    assert_eq!(service.ledger().initial_balance(), 700);
    Ok(())
}

#[tokio::test]
async fn test_read_failure_starts_empty() -> Result<()> {
    let store = FlakyStore::failing_reads();
    let mut service = TrackerService::open(store, USER).await;

    assert!(service.ledger().is_empty());
    assert!(service.load_error().unwrap().contains("connection refused"));

    // The session stays usable and later writes go through
    let outcome = service.add_account("Vacation", 5000).await?;
    assert_eq!(outcome.sync, SyncStatus::Saved);
    Ok(())
}

#[tokio::test]
async fn test_reset_all_deletes_document() -> Result<()> {
    let (mut service, temp) = test_service().await?;
    service
        .add_transaction("Rent", 120000, Some(parse_date("2024-01-01")), TransactionKind::Expense)
        .await?;
    service.add_account("Vacation", 5000).await?;

    service.reset_all().await?;
    assert!(service.ledger().is_empty());
    assert!(service.store().read(USER).await?.is_none());
    drop(service);

    let service = reopen(&temp).await?;
    assert!(service.ledger().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_reset_all_failure_keeps_data() -> Result<()> {
    let mut service = TrackerService::open(FlakyStore::failing_writes(), USER).await;
    service.set_initial_balance(900).await;

    let err = service.reset_all().await.unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));
    assert_eq!(service.ledger().initial_balance(), 900);
    Ok(())
}
