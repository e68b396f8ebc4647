use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 2] = [TransactionKind::Deposit, TransactionKind::Withdrawal];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Some(TransactionKind::Deposit),
            "withdrawal" => Some(TransactionKind::Withdrawal),
            _ => None,
        }
    }

    /// Effect of an amount of this kind on the owning account's balance.
    pub fn signed(&self, amount: Cents) -> Cents {
        match self {
            TransactionKind::Deposit => amount,
            TransactionKind::Withdrawal => -amount,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An append-only ledger entry against one account.
/// Transactions are never edited, reassigned or deleted individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Submission order, assigned by the ledger store
    pub sequence: i64,
    /// Back-reference to the owning account, used for lookup only
    pub account_id: AccountId,
    pub kind: TransactionKind,
    /// Always positive
    pub amount: Cents,
    pub date: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction. The sequence number is assigned by the store.
    pub fn new(account_id: AccountId, kind: TransactionKind, amount: Cents, date: DateTime<Utc>) -> Self {
        assert!(amount > 0, "Transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            sequence: 0,
            account_id,
            kind,
            amount,
            date,
        }
    }

    pub fn signed_amount(&self) -> Cents {
        self.kind.signed(self.amount)
    }
}
