//! Stateless checks run on raw user input before a mutation is submitted.

use crate::domain::{
    format_cents, parse_cents, AccountType, Cents, ParseCentsError, TransactionKind, MAX_AMOUNT,
};

use super::ValidationError;

/// A validated request to open an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountDraft {
    pub initial_balance: Cents,
    pub account_type: AccountType,
}

/// A validated request to record a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionDraft {
    pub amount: Cents,
    pub kind: TransactionKind,
}

pub fn validate_account_creation(
    initial_balance: Option<&str>,
    account_type: Option<&str>,
) -> Result<AccountDraft, ValidationError> {
    let initial_balance = parse_amount(initial_balance)?;
    if initial_balance < 0 {
        return Err(ValidationError::InvalidAmount(
            "initial balance must be zero or more".to_string(),
        ));
    }

    let raw_type = account_type.unwrap_or_default();
    let account_type = AccountType::from_str(raw_type).ok_or_else(|| {
        ValidationError::InvalidAccountType(format!(
            "'{}' (expected current or savings)",
            raw_type
        ))
    })?;

    Ok(AccountDraft {
        initial_balance,
        account_type,
    })
}

pub fn validate_transaction(
    amount: Option<&str>,
    kind: Option<&str>,
) -> Result<TransactionDraft, ValidationError> {
    let amount = parse_amount(amount)?;
    if amount <= 0 {
        return Err(ValidationError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        ));
    }

    let raw_kind = kind.unwrap_or_default();
    let kind = TransactionKind::from_str(raw_kind).ok_or_else(|| {
        ValidationError::InvalidKind(format!("'{}' (expected deposit or withdrawal)", raw_kind))
    })?;

    Ok(TransactionDraft { amount, kind })
}

fn parse_amount(raw: Option<&str>) -> Result<Cents, ValidationError> {
    let raw = raw.ok_or_else(|| ValidationError::InvalidAmount("amount is missing".to_string()))?;
    let cents = parse_cents(raw).map_err(|e| match e {
        ParseCentsError::Empty => ValidationError::InvalidAmount(e.to_string()),
        _ => ValidationError::InvalidAmount(format!("'{}' is {}", raw.trim(), e)),
    })?;
    if cents > MAX_AMOUNT {
        return Err(ValidationError::InvalidAmount(format!(
            "'{}' exceeds the maximum of {}",
            raw.trim(),
            format_cents(MAX_AMOUNT)
        )));
    }
    Ok(cents)
}
