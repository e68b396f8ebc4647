// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bankflow::application::{LedgerStore, StoreError, SyncController};
use bankflow::domain::{
    Account, AccountId, AccountType, BalanceStats, Cents, Transaction, TransactionKind,
    TransactionStats,
};
use bankflow::storage::Repository;
use tempfile::TempDir;
use tokio::sync::Semaphore;

/// Helper to create a repository backed by a temporary database
pub async fn test_repo() -> Result<(Arc<Repository>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let repo = Repository::open(db_path.to_str().unwrap()).await?;
    Ok((Arc::new(repo), temp_dir))
}

/// Helper to create a controller over a fresh repository
pub async fn test_controller() -> Result<(SyncController, Arc<Repository>, TempDir)> {
    let (repo, temp) = test_repo().await?;
    let controller = SyncController::new(repo.clone());
    Ok((controller, repo, temp))
}

/// Helper to create a controller over a scripted store
pub async fn scripted_controller() -> Result<(SyncController, Arc<ScriptedStore>, TempDir)> {
    let (repo, temp) = test_repo().await?;
    let store = Arc::new(ScriptedStore::new(repo));
    let controller = SyncController::new(store.clone());
    Ok((controller, store, temp))
}

/// Store wrapper that can hold requests until released, or fail them.
pub struct ScriptedStore {
    inner: Arc<Repository>,
    pub hold_create: AtomicBool,
    pub hold_record: AtomicBool,
    pub hold_list_transactions: AtomicBool,
    pub fail_mutations: AtomicBool,
    pub fail_transaction_stats: AtomicBool,
    arrived: Semaphore,
    released: Semaphore,
}

impl ScriptedStore {
    pub fn new(inner: Arc<Repository>) -> Self {
        Self {
            inner,
            hold_create: AtomicBool::new(false),
            hold_record: AtomicBool::new(false),
            hold_list_transactions: AtomicBool::new(false),
            fail_mutations: AtomicBool::new(false),
            fail_transaction_stats: AtomicBool::new(false),
            arrived: Semaphore::new(0),
            released: Semaphore::new(0),
        }
    }

    pub fn repo(&self) -> &Repository {
        &self.inner
    }

    /// Wait until a held request has reached the store.
    pub async fn wait_for_request(&self) {
        self.arrived.acquire().await.unwrap().forget();
    }

    /// Let one held request continue.
    pub fn release(&self) {
        self.released.add_permits(1);
    }

    async fn hold_if(&self, flag: &AtomicBool) {
        if flag.load(Ordering::SeqCst) {
            self.arrived.add_permits(1);
            self.released.acquire().await.unwrap().forget();
        }
    }

    fn transport_failure_if(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Transport(anyhow::anyhow!("connection reset")));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for ScriptedStore {
    async fn create_account(
        &self,
        initial_balance: Cents,
        account_type: AccountType,
    ) -> Result<Account, StoreError> {
        self.hold_if(&self.hold_create).await;
        self.transport_failure_if(&self.fail_mutations)?;
        self.inner.create_account(initial_balance, account_type).await
    }

    async fn delete_account(&self, account_id: AccountId) -> Result<(), StoreError> {
        self.transport_failure_if(&self.fail_mutations)?;
        self.inner.delete_account(account_id).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.inner.list_accounts().await
    }

    async fn total_balance_stats(&self) -> Result<BalanceStats, StoreError> {
        self.inner.total_balance_stats().await
    }

    async fn record_transaction(
        &self,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Cents,
    ) -> Result<Transaction, StoreError> {
        self.hold_if(&self.hold_record).await;
        self.transport_failure_if(&self.fail_mutations)?;
        self.inner.record_transaction(account_id, kind, amount).await
    }

    async fn list_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.hold_if(&self.hold_list_transactions).await;
        self.inner.list_transactions(account_id).await
    }

    async fn transaction_stats(&self) -> Result<TransactionStats, StoreError> {
        self.transport_failure_if(&self.fail_transaction_stats)?;
        self.inner.transaction_stats().await
    }
}
