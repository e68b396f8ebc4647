use super::{Account, Cents, Transaction};

/// Compute an account balance from its opening amount and its transactions.
/// Balance = initial + sum of deposits - sum of withdrawals
pub fn compute_balance<'a>(
    initial_balance: Cents,
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> Cents {
    transactions
        .into_iter()
        .fold(initial_balance, |balance, tx| balance + tx.signed_amount())
}

/// Check that an account's reported balance matches its transaction history.
/// Transactions belonging to other accounts are ignored.
pub fn verify_balance(account: &Account, transactions: &[Transaction]) -> Result<(), LedgerError> {
    let expected = compute_balance(
        account.initial_balance,
        transactions.iter().filter(|tx| tx.account_id == account.id),
    );

    if expected != account.balance {
        return Err(LedgerError::BalanceMismatch {
            expected,
            actual: account.balance,
        });
    }
    Ok(())
}

/// Check that withdrawing `amount` keeps the balance non-negative.
pub fn ensure_funds(balance: Cents, amount: Cents) -> Result<(), LedgerError> {
    if balance < amount {
        return Err(LedgerError::InsufficientFunds {
            balance,
            requested: amount,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    BalanceMismatch { expected: Cents, actual: Cents },
    InsufficientFunds { balance: Cents, requested: Cents },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::BalanceMismatch { expected, actual } => write!(
                f,
                "Balance is {} cents but history adds up to {} cents",
                actual, expected
            ),
            LedgerError::InsufficientFunds { balance, requested } => write!(
                f,
                "Insufficient funds: balance {} cents, withdrawal {} cents",
                balance, requested
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{AccountType, TransactionKind};

    fn make_tx(account: &Account, kind: TransactionKind, amount: Cents) -> Transaction {
        Transaction::new(account.id, kind, amount, Utc::now())
    }

    #[test]
    fn test_compute_balance_empty() {
        let none: Vec<Transaction> = Vec::new();
        assert_eq!(compute_balance(0, &none), 0);
        assert_eq!(compute_balance(10000, &none), 10000);
    }

    #[test]
    fn test_compute_balance_mixed() {
        let account = Account::open(AccountType::Current, 10000);
        let transactions = vec![
            make_tx(&account, TransactionKind::Deposit, 5000),    // +50
            make_tx(&account, TransactionKind::Withdrawal, 2500), // -25
            make_tx(&account, TransactionKind::Deposit, 100),     // +1
        ];

        assert_eq!(compute_balance(account.initial_balance, &transactions), 12600);
    }

    #[test]
    fn test_verify_balance_ignores_other_accounts() {
        let mut account = Account::open(AccountType::Current, 10000);
        let other = Account::open(AccountType::Savings, 0);
        let transactions = vec![
            make_tx(&account, TransactionKind::Deposit, 5000),
            make_tx(&other, TransactionKind::Deposit, 99999),
        ];
        account.balance = 15000;

        assert!(verify_balance(&account, &transactions).is_ok());
    }

    #[test]
    fn test_verify_balance_detects_mismatch() {
        let mut account = Account::open(AccountType::Current, 10000);
        account.balance = 9000;

        assert_eq!(
            verify_balance(&account, &[]),
            Err(LedgerError::BalanceMismatch {
                expected: 10000,
                actual: 9000
            })
        );
    }

    #[test]
    fn test_ensure_funds() {
        assert!(ensure_funds(15000, 15000).is_ok());
        assert!(ensure_funds(15000, 100).is_ok());
        assert_eq!(
            ensure_funds(15000, 20000),
            Err(LedgerError::InsufficientFunds {
                balance: 15000,
                requested: 20000
            })
        );
        assert!(ensure_funds(0, 1).is_err());
    }
}
