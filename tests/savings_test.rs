mod common;

use anyhow::Result;
use chrono::Utc;
use common::{reopen, test_service};
use tallybook::application::{AppError, SyncStatus};
use tallybook::domain::TransactionKind;

#[tokio::test]
async fn test_transfer_from_checking_scenario() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    service.add_account("Vacation", 5000).await?;

    let outcome = service.transfer_from_checking(0, 20000).await?;
    assert_eq!(outcome.sync, SyncStatus::Saved);
    let id = outcome.value.unwrap();

    assert_eq!(service.savings_accounts()[0].amount, 25000);

    let tx = service.ledger().get(id).unwrap();
    assert!(tx.name.contains("Vacation"));
    assert_eq!(tx.amount, 20000);
    assert_eq!(tx.kind, TransactionKind::Expense);
    assert!(tx.paid);
    assert_eq!(tx.due_date, Some(Utc::now().date_naive()));

    // The transfer is already paid, so it lowers the net and projected balance alike
    let totals = service.totals();
    assert_eq!(totals.paid_expenses, 20000);
    assert_eq!(totals.remaining_expenses, 0);
    assert_eq!(totals.projected_balance, -20000);
    Ok(())
}

#[tokio::test]
async fn test_transfer_then_withdraw_restores_account() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    service.add_account("Emergency", 30000).await?;

    service.transfer_from_checking(0, 10000).await?;
    service.withdraw_to_checking(0, 10000).await?;

    assert_eq!(service.savings_accounts()[0].amount, 30000);
    let transactions = service.ledger().transactions();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].kind, TransactionKind::Expense);
    assert_eq!(transactions[1].kind, TransactionKind::Income);
    assert!(transactions.iter().all(|t| t.amount == 10000 && t.paid));

    let totals = service.totals();
    assert_eq!(totals.net_balance, 0);
    Ok(())
}

#[tokio::test]
async fn test_withdraw_more_than_balance_changes_nothing() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    service.add_account("Vacation", 5000).await?;

    let err = service.withdraw_to_checking(0, 5001).await.unwrap_err();
    match err {
        AppError::InsufficientFunds {
            account,
            balance,
            requested,
        } => {
            assert_eq!(account, "Vacation");
            assert_eq!(balance, 5000);
            assert_eq!(requested, 5001);
        }
        other => panic!("expected insufficient funds, got {other:?}"),
    }

    assert_eq!(service.savings_accounts()[0].amount, 5000);
    assert!(service.ledger().transactions().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_deposit_does_not_touch_transactions() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    service.add_account("Car fund", 0).await?;

    let outcome = service.deposit(0, 4250).await?;
    assert_eq!(outcome.value, Some(4250));
    assert!(service.ledger().transactions().is_empty());

    let err = service.deposit(0, -100).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(service.total_savings(), 4250);
    Ok(())
}

#[tokio::test]
async fn test_account_rules() -> Result<()> {
    let (mut service, _temp) = test_service().await?;

    // An existing overdrawn balance can be recorded
    service.add_account("Credit line", -1500).await?;
    assert_eq!(service.total_savings(), -1500);

    let err = service.add_account("", 100).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let outcome = service.transfer_from_checking(3, 100).await?;
    assert!(!outcome.is_applied());
    assert_eq!(outcome.sync, SyncStatus::Skipped);
    assert!(service.ledger().transactions().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_remove_account_keeps_transfer_history() -> Result<()> {
    let (mut service, temp) = test_service().await?;
    service.add_account("Vacation", 5000).await?;
    service.add_account("House", 100000).await?;
    service.transfer_from_checking(0, 2000).await?;

    let removed = service.remove_account(0).await?;
    assert_eq!(removed.value.map(|a| a.name), Some("Vacation".to_string()));
    drop(service);

    let service = reopen(&temp).await?;
    assert_eq!(service.savings_accounts().len(), 1);
    assert_eq!(service.savings_accounts()[0].name, "House");
    assert_eq!(service.ledger().transactions().len(), 1);
    assert_eq!(service.ledger().transactions()[0].name, "Transfer to Vacation");
    Ok(())
}
