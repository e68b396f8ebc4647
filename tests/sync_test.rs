mod common;

use std::sync::atomic::Ordering;

use anyhow::Result;
use bankflow::application::{AppError, Control, LedgerStore, MutationPhase, QueryKey};
use bankflow::domain::TransactionStats;
use common::{scripted_controller, test_controller};

#[tokio::test]
async fn test_deposit_refreshes_every_dependent_view() -> Result<()> {
    let (controller, _repo, _temp) = test_controller().await?;

    let account = controller.open_account(Some("100"), Some("current")).await?;
    let views = [
        controller.watch(QueryKey::Accounts).await?,
        controller
            .watch(QueryKey::AccountTransactions(account.id))
            .await?,
        controller.watch(QueryKey::BalanceStats).await?,
        controller.watch(QueryKey::TransactionStats).await?,
    ];
    for view in views {
        controller.load(view).await?;
    }
    assert_eq!(controller.balance_stats().await.unwrap().sum, 10000);
    assert_eq!(controller.history(account.id).await.unwrap().len(), 0);

    controller
        .record_transaction(account.id, Some("50"), Some("deposit"))
        .await?;

    // No further loads: the mutation itself refreshed everything
    let listed = controller.accounts().await.unwrap();
    assert_eq!(listed[0].balance, 15000);
    assert_eq!(controller.history(account.id).await.unwrap().len(), 1);
    assert_eq!(controller.balance_stats().await.unwrap().sum, 15000);
    assert_eq!(
        controller.transaction_stats().await,
        Some(TransactionStats {
            sum_deposits: 5000,
            sum_withdrawals: 0,
            count: 1
        })
    );

    for view in views {
        let snapshot = controller.view(view).await?;
        assert!(!snapshot.stale, "{} still stale", snapshot.key);
        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());
    }
    assert_eq!(
        controller.phase(Control::RecordTransaction(account.id)).await,
        MutationPhase::Idle
    );
    Ok(())
}

#[tokio::test]
async fn test_opening_an_account_leaves_transaction_views_alone() -> Result<()> {
    let (controller, store, _temp) = scripted_controller().await?;

    let stats_view = controller.watch(QueryKey::TransactionStats).await?;
    controller.load(stats_view).await?;

    // A stats fetch would fail now, so a refresh would show up as an error
    store.fail_transaction_stats.store(true, Ordering::SeqCst);
    controller.open_account(Some("10"), Some("savings")).await?;

    let snapshot = controller.view(stats_view).await?;
    assert!(snapshot.error.is_none());
    assert!(!snapshot.stale);
    Ok(())
}

#[tokio::test]
async fn test_late_response_for_dismissed_view_is_discarded() -> Result<()> {
    let (controller, store, _temp) = scripted_controller().await?;

    let account = controller.open_account(Some("100"), Some("current")).await?;
    store
        .repo()
        .record_transaction(account.id, bankflow::TransactionKind::Deposit, 500)
        .await?;

    let view = controller
        .watch(QueryKey::AccountTransactions(account.id))
        .await?;
    store.hold_list_transactions.store(true, Ordering::SeqCst);

    let loading = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.load(view).await })
    };

    store.wait_for_request().await;
    controller.dismiss(view).await;
    store.release();

    // No error surfaces and nothing is cached for the dismissed view
    loading.await??;
    assert!(!controller.is_live(view).await);
    assert!(controller.history(account.id).await.is_none());
    assert!(matches!(
        controller.view(view).await,
        Err(AppError::UnknownView(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_second_submission_is_refused_while_pending() -> Result<()> {
    let (controller, store, _temp) = scripted_controller().await?;

    store.hold_create.store(true, Ordering::SeqCst);
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.open_account(Some("100"), Some("current")).await })
    };

    store.wait_for_request().await;
    assert_eq!(
        controller.phase(Control::OpenAccount).await,
        MutationPhase::Submitting
    );

    let second = controller
        .open_account(Some("100"), Some("current"))
        .await
        .unwrap_err();
    assert!(matches!(second, AppError::Busy(Control::OpenAccount)));
    assert!(second.is_retryable());

    store.release();
    first.await??;

    assert_eq!(
        controller.phase(Control::OpenAccount).await,
        MutationPhase::Idle
    );
    assert_eq!(store.repo().list_accounts().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_second_submission_is_refused_while_refreshing() -> Result<()> {
    let (controller, store, _temp) = scripted_controller().await?;

    let account = controller.open_account(Some("100"), Some("current")).await?;
    let history_view = controller
        .watch(QueryKey::AccountTransactions(account.id))
        .await?;
    controller.load(history_view).await?;

    // The deposit itself goes through, the history refetch that follows is held
    store.hold_list_transactions.store(true, Ordering::SeqCst);
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .record_transaction(account.id, Some("10"), Some("deposit"))
                .await
        })
    };

    store.wait_for_request().await;
    let control = Control::RecordTransaction(account.id);
    assert_eq!(controller.phase(control).await, MutationPhase::Refreshing);

    let second = controller
        .record_transaction(account.id, Some("10"), Some("deposit"))
        .await
        .unwrap_err();
    assert!(matches!(second, AppError::Busy(c) if c == control));

    store.hold_list_transactions.store(false, Ordering::SeqCst);
    store.release();
    first.await??;

    assert_eq!(controller.phase(control).await, MutationPhase::Idle);
    assert_eq!(store.repo().list_transactions(account.id).await?.len(), 1);
    assert_eq!(controller.history(account.id).await.unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_pending_control_answers_busy_before_checking_funds() -> Result<()> {
    let (controller, store, _temp) = scripted_controller().await?;

    let account = controller.open_account(Some("100"), Some("current")).await?;
    let accounts_view = controller.watch(QueryKey::Accounts).await?;
    controller.load(accounts_view).await?;

    store.hold_record.store(true, Ordering::SeqCst);
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .record_transaction(account.id, Some("10"), Some("deposit"))
                .await
        })
    };
    store.wait_for_request().await;

    // The cached listing is fresh, but the control is still submitting
    let err = controller
        .record_transaction(account.id, Some("500"), Some("withdrawal"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Busy(_)));

    store.hold_record.store(false, Ordering::SeqCst);
    store.release();
    first.await??;
    Ok(())
}

#[tokio::test]
async fn test_local_insufficient_funds_is_recorded_on_the_control() -> Result<()> {
    let (controller, _repo, _temp) = test_controller().await?;

    let account = controller.open_account(Some("100"), Some("current")).await?;
    let accounts_view = controller.watch(QueryKey::Accounts).await?;
    controller.load(accounts_view).await?;

    let err = controller
        .record_transaction(account.id, Some("500"), Some("withdrawal"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds { .. }));

    let control = Control::RecordTransaction(account.id);
    assert_eq!(controller.phase(control).await, MutationPhase::Idle);
    assert!(controller
        .last_error(control)
        .await
        .unwrap()
        .contains("Insufficient funds"));

    // A valid retry clears it
    controller
        .record_transaction(account.id, Some("50"), Some("withdrawal"))
        .await?;
    assert!(controller.last_error(control).await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_returns_to_idle() -> Result<()> {
    let (controller, store, _temp) = scripted_controller().await?;

    let account = controller.open_account(Some("100"), Some("current")).await?;
    let accounts_view = controller.watch(QueryKey::Accounts).await?;
    controller.load(accounts_view).await?;

    store.fail_mutations.store(true, Ordering::SeqCst);
    let err = controller
        .record_transaction(account.id, Some("25"), Some("deposit"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TransportFailure(_)));
    assert!(err.is_retryable());

    let control = Control::RecordTransaction(account.id);
    assert_eq!(controller.phase(control).await, MutationPhase::Idle);
    assert!(controller
        .last_error(control)
        .await
        .unwrap()
        .contains("connection reset"));

    // No refresh happened and the cached balance is untouched
    let snapshot = controller.view(accounts_view).await?;
    assert!(!snapshot.stale);
    assert_eq!(controller.accounts().await.unwrap()[0].balance, 10000);

    // The user can simply retry
    store.fail_mutations.store(false, Ordering::SeqCst);
    controller
        .record_transaction(account.id, Some("25"), Some("deposit"))
        .await?;
    assert_eq!(controller.accounts().await.unwrap()[0].balance, 12500);
    assert!(controller.last_error(control).await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_refresh_failure_does_not_fail_the_mutation() -> Result<()> {
    let (controller, store, _temp) = scripted_controller().await?;

    let account = controller.open_account(Some("100"), Some("current")).await?;
    let stats_view = controller.watch(QueryKey::TransactionStats).await?;
    let accounts_view = controller.watch(QueryKey::Accounts).await?;
    controller.load(stats_view).await?;
    controller.load(accounts_view).await?;

    store.fail_transaction_stats.store(true, Ordering::SeqCst);
    controller
        .record_transaction(account.id, Some("5"), Some("deposit"))
        .await?;

    let stats = controller.view(stats_view).await?;
    assert!(stats.stale);
    assert!(stats.error.unwrap().contains("connection reset"));

    // Other views refreshed normally
    assert_eq!(controller.accounts().await.unwrap()[0].balance, 10500);
    assert_eq!(
        controller.phase(Control::RecordTransaction(account.id)).await,
        MutationPhase::Idle
    );

    // Loading the view again once the store recovers clears the error
    store.fail_transaction_stats.store(false, Ordering::SeqCst);
    controller.load(stats_view).await?;
    let stats = controller.view(stats_view).await?;
    assert!(!stats.stale);
    assert!(stats.error.is_none());
    assert_eq!(controller.transaction_stats().await.unwrap().count, 1);
    Ok(())
}

#[tokio::test]
async fn test_load_surfaces_query_failure() -> Result<()> {
    let (controller, store, _temp) = scripted_controller().await?;

    store.fail_transaction_stats.store(true, Ordering::SeqCst);
    let view = controller.watch(QueryKey::TransactionStats).await?;

    let err = controller.load(view).await.unwrap_err();
    assert!(matches!(err, AppError::TransportFailure(_)));
    let snapshot = controller.view(view).await?;
    assert!(snapshot.value.is_none());
    assert!(snapshot.error.is_some());
    Ok(())
}

#[tokio::test]
async fn test_unknown_view() -> Result<()> {
    let (controller, _repo, _temp) = test_controller().await?;

    assert!(matches!(
        controller.load(42).await,
        Err(AppError::UnknownView(42))
    ));
    Ok(())
}
