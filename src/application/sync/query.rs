use std::fmt;

use crate::domain::{Account, AccountId, BalanceStats, Transaction, TransactionStats};

/// Identity of a cached query: what was asked and with which parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Accounts,
    AccountTransactions(AccountId),
    BalanceStats,
    TransactionStats,
}

/// Invalidation tag. A mutation names the tags it touches and every query
/// carrying one of them is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Accounts,
    AccountTransactions(AccountId),
    BalanceStats,
    TransactionStats,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Accounts => write!(f, "accounts"),
            Tag::AccountTransactions(id) => write!(f, "account:{}:transactions", id),
            Tag::BalanceStats => write!(f, "stats:balance"),
            Tag::TransactionStats => write!(f, "stats:transactions"),
        }
    }
}

impl QueryKey {
    pub fn tags(&self) -> Vec<Tag> {
        match self {
            QueryKey::Accounts => vec![Tag::Accounts],
            QueryKey::AccountTransactions(id) => vec![Tag::AccountTransactions(*id)],
            QueryKey::BalanceStats => vec![Tag::BalanceStats],
            QueryKey::TransactionStats => vec![Tag::TransactionStats],
        }
    }

    pub fn account(&self) -> Option<AccountId> {
        match self {
            QueryKey::AccountTransactions(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Accounts => write!(f, "listAccounts"),
            QueryKey::AccountTransactions(id) => write!(f, "listTransactions({})", id),
            QueryKey::BalanceStats => write!(f, "totalBalanceStats"),
            QueryKey::TransactionStats => write!(f, "transactionStats"),
        }
    }
}

/// Result of a query, exactly as returned by the ledger store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Accounts(Vec<Account>),
    Transactions(Vec<Transaction>),
    BalanceStats(BalanceStats),
    TransactionStats(TransactionStats),
}

impl QueryValue {
    pub fn as_accounts(&self) -> Option<&[Account]> {
        match self {
            QueryValue::Accounts(accounts) => Some(accounts),
            _ => None,
        }
    }

    pub fn as_transactions(&self) -> Option<&[Transaction]> {
        match self {
            QueryValue::Transactions(transactions) => Some(transactions),
            _ => None,
        }
    }

    pub fn as_balance_stats(&self) -> Option<&BalanceStats> {
        match self {
            QueryValue::BalanceStats(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn as_transaction_stats(&self) -> Option<&TransactionStats> {
        match self {
            QueryValue::TransactionStats(stats) => Some(stats),
            _ => None,
        }
    }
}

/// The tags invalidated by a successful mutation.
pub fn tags_for_account_change() -> Vec<Tag> {
    vec![Tag::Accounts, Tag::BalanceStats]
}

pub fn tags_for_transaction(account_id: AccountId) -> Vec<Tag> {
    vec![
        Tag::AccountTransactions(account_id),
        Tag::Accounts,
        Tag::BalanceStats,
        Tag::TransactionStats,
    ]
}
