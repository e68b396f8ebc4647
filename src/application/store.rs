use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    Account, AccountId, AccountType, BalanceStats, Cents, Transaction, TransactionKind,
    TransactionStats,
};

#[derive(Error, Debug)]
pub enum StoreError {
    /// The store understood the request and refused it (unknown account,
    /// insufficient funds, ...).
    #[error("{0}")]
    Rejected(String),

    /// The request could not be completed.
    #[error("{0:#}")]
    Transport(#[from] anyhow::Error),
}

/// The system of record for accounts and transactions.
///
/// Every mutation is applied atomically by the store; the client never writes
/// balances itself and only learns exact values by querying again.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_account(
        &self,
        initial_balance: Cents,
        account_type: AccountType,
    ) -> Result<Account, StoreError>;

    async fn delete_account(&self, account_id: AccountId) -> Result<(), StoreError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    async fn total_balance_stats(&self) -> Result<BalanceStats, StoreError>;

    async fn record_transaction(
        &self,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Cents,
    ) -> Result<Transaction, StoreError>;

    /// Transactions of one account in submission order.
    async fn list_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn transaction_stats(&self) -> Result<TransactionStats, StoreError>;
}
