use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, SqlitePool, Transaction as SqlTransaction};
use uuid::Uuid;

use crate::application::{LedgerStore, StoreError};
use crate::domain::{
    ensure_funds, Account, AccountId, AccountType, BalanceStats, Cents, Transaction,
    TransactionKind, TransactionStats, MAX_AMOUNT,
};

use super::MIGRATION_001_INITIAL;

/// SQLite ledger store. Every mutation runs inside one SQL transaction, so an
/// account's balance and its history never disagree.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Open the database file at `path`, creating and migrating it if needed.
    pub async fn open(path: &str) -> Result<Self> {
        Self::init(&format!("sqlite:{}?mode=rwc", path)).await
    }

    // ========================
    // Account operations
    // ========================

    pub async fn insert_account(
        &self,
        initial_balance: Cents,
        account_type: AccountType,
    ) -> Result<Account, StoreError> {
        if initial_balance < 0 {
            return Err(StoreError::Rejected(
                "Initial balance cannot be negative".to_string(),
            ));
        }
        if initial_balance > MAX_AMOUNT {
            return Err(StoreError::Rejected(
                "Initial balance exceeds the maximum amount".to_string(),
            ));
        }

        let account = Account::open(account_type, initial_balance);
        sqlx::query(
            r#"
            INSERT INTO accounts (id, account_type, initial_balance_cents, balance_cents, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(account.account_type.as_str())
        .bind(account.initial_balance)
        .bind(account.balance)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;

        Ok(account)
    }

    /// Remove an account. Its transactions stay in the ledger.
    pub async fn remove_account(&self, id: AccountId) -> Result<(), StoreError> {
        let deleted = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete account")?
            .rows_affected();

        if deleted == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_type, initial_balance_cents, balance_cents, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// List all accounts, oldest first.
    pub async fn all_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_type, initial_balance_cents, balance_cents, created_at
            FROM accounts
            ORDER BY created_at, rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    pub async fn balance_totals(&self) -> Result<BalanceStats> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(balance_cents), 0) AS total, COUNT(*) AS count FROM accounts",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute balance totals")?;

        Ok(BalanceStats::from_totals(row.get("total"), row.get("count")))
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let type_str: String = row.get("account_type");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            account_type: AccountType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account type: {}", type_str))?,
            initial_balance: row.get("initial_balance_cents"),
            balance: row.get("balance_cents"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Append a transaction and apply it to the account balance atomically.
    /// Withdrawals that would take the balance below zero are refused.
    pub async fn append_transaction(
        &self,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Cents,
    ) -> Result<Transaction, StoreError> {
        if amount <= 0 {
            return Err(StoreError::Rejected(
                "Amount must be positive".to_string(),
            ));
        }
        if amount > MAX_AMOUNT {
            return Err(StoreError::Rejected(
                "Amount exceeds the maximum amount".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row = sqlx::query("SELECT balance_cents FROM accounts WHERE id = ?")
            .bind(account_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch account balance")?;
        let Some(row) = row else {
            return Err(not_found(account_id));
        };
        let balance: Cents = row.get("balance_cents");

        if kind == TransactionKind::Withdrawal {
            ensure_funds(balance, amount).map_err(|e| StoreError::Rejected(e.to_string()))?;
        }
        let delta = kind.signed(amount);
        if balance.checked_add(delta).is_none() {
            return Err(StoreError::Rejected(format!(
                "Balance of account {} would overflow",
                account_id
            )));
        }

        // The guard repeats the funds check so a concurrent writer cannot
        // slip between the read above and this update.
        let updated = sqlx::query(
            "UPDATE accounts SET balance_cents = balance_cents + ? WHERE id = ? AND balance_cents + ? >= 0",
        )
        .bind(delta)
        .bind(account_id.to_string())
        .bind(delta)
        .execute(&mut *tx)
        .await
        .context("Failed to update account balance")?
        .rows_affected();
        if updated == 0 {
            return Err(StoreError::Rejected(format!(
                "Insufficient funds on account {}",
                account_id
            )));
        }

        let mut transaction = Transaction::new(account_id, kind, amount, Utc::now());
        transaction.sequence = Self::next_sequence(&mut tx).await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, sequence, account_id, kind, amount_cents, date)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.sequence)
        .bind(account_id.to_string())
        .bind(kind.as_str())
        .bind(amount)
        .bind(transaction.date.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save transaction")?;

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(transaction)
    }

    async fn next_sequence(tx: &mut SqlTransaction<'_, Sqlite>) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'transaction_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut **tx)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    /// Transactions of one account, ordered by sequence number.
    pub async fn transactions_for_account(&self, account_id: AccountId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sequence, account_id, kind, amount_cents, date
            FROM transactions
            WHERE account_id = ?
            ORDER BY sequence
            "#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    pub async fn transaction_totals(&self) -> Result<TransactionStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN kind = 'deposit' THEN amount_cents ELSE 0 END), 0) AS deposits,
                COALESCE(SUM(CASE WHEN kind = 'withdrawal' THEN amount_cents ELSE 0 END), 0) AS withdrawals,
                COUNT(*) AS count
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute transaction totals")?;

        Ok(TransactionStats {
            sum_deposits: row.get("deposits"),
            sum_withdrawals: row.get("withdrawals"),
            count: row.get("count"),
        })
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let account_id_str: String = row.get("account_id");
        let kind_str: String = row.get("kind");
        let date_str: String = row.get("date");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            sequence: row.get("sequence"),
            account_id: Uuid::parse_str(&account_id_str).context("Invalid account ID")?,
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            amount: row.get("amount_cents"),
            date: DateTime::parse_from_rfc3339(&date_str)
                .context("Invalid transaction date")?
                .with_timezone(&Utc),
        })
    }
}

fn not_found(id: AccountId) -> StoreError {
    StoreError::Rejected(format!("Account not found: {}", id))
}

#[async_trait]
impl LedgerStore for Repository {
    async fn create_account(
        &self,
        initial_balance: Cents,
        account_type: AccountType,
    ) -> Result<Account, StoreError> {
        self.insert_account(initial_balance, account_type).await
    }

    async fn delete_account(&self, account_id: AccountId) -> Result<(), StoreError> {
        self.remove_account(account_id).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.all_accounts().await?)
    }

    async fn total_balance_stats(&self) -> Result<BalanceStats, StoreError> {
        Ok(self.balance_totals().await?)
    }

    async fn record_transaction(
        &self,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Cents,
    ) -> Result<Transaction, StoreError> {
        self.append_transaction(account_id, kind, amount).await
    }

    async fn list_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.transactions_for_account(account_id).await?)
    }

    async fn transaction_stats(&self) -> Result<TransactionStats, StoreError> {
        Ok(self.transaction_totals().await?)
    }
}
