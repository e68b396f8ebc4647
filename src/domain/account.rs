use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type AccountId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Everyday account
    Current,
    /// Savings account
    Savings,
}

impl AccountType {
    pub const ALL: [AccountType; 2] = [AccountType::Current, AccountType::Savings];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Current => "current",
            AccountType::Savings => "savings",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "current" => Some(AccountType::Current),
            "savings" => Some(AccountType::Savings),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An account as reported by the ledger store.
///
/// The type and creation date never change once the store has assigned them.
/// `balance` always equals `initial_balance` plus deposits minus withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub account_type: AccountType,
    pub initial_balance: Cents,
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account. Only ledger stores should call this: the id and
    /// creation date are theirs to assign.
    pub fn open(account_type: AccountType, initial_balance: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_type,
            initial_balance,
            balance: initial_balance,
            created_at: Utc::now(),
        }
    }
}
