use serde::{Deserialize, Serialize};

use super::{Account, Cents, Transaction, TransactionKind};

/// Totals over every open account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceStats {
    pub sum: Cents,
    pub count: i64,
    /// `sum / count` rounded to the nearest cent, 0 when there are no accounts
    pub average: Cents,
}

impl BalanceStats {
    pub fn from_totals(sum: Cents, count: i64) -> Self {
        let average = if count > 0 {
            (sum as f64 / count as f64).round() as Cents
        } else {
            0
        };
        Self {
            sum,
            count,
            average,
        }
    }
}

/// Deposit and withdrawal totals over every recorded transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub sum_deposits: Cents,
    pub sum_withdrawals: Cents,
    pub count: i64,
}

impl TransactionStats {
    /// Deposits minus withdrawals.
    pub fn net(&self) -> Cents {
        self.sum_deposits.saturating_sub(self.sum_withdrawals)
    }
}

pub fn total_balance_stats(accounts: &[Account]) -> BalanceStats {
    let sum = accounts
        .iter()
        .fold(0, |sum: Cents, a| sum.saturating_add(a.balance));
    BalanceStats::from_totals(sum, accounts.len() as i64)
}

pub fn transaction_stats(transactions: &[Transaction]) -> TransactionStats {
    transactions
        .iter()
        .fold(TransactionStats::default(), |mut stats, tx| {
            match tx.kind {
                TransactionKind::Deposit => {
                    stats.sum_deposits = stats.sum_deposits.saturating_add(tx.amount)
                }
                TransactionKind::Withdrawal => {
                    stats.sum_withdrawals = stats.sum_withdrawals.saturating_add(tx.amount)
                }
            }
            stats.count += 1;
            stats
        })
}

/// Most recent first. The sort is stable, so transactions sharing a date keep
/// the order in which they were given (submission order when the input comes
/// straight from the store).
pub fn ordered_history(transactions: &[Transaction]) -> Vec<Transaction> {
    let mut ordered = transactions.to_vec();
    ordered.sort_by(|a, b| b.date.cmp(&a.date));
    ordered
}
