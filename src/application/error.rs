use thiserror::Error;

use crate::domain::{AccountId, Cents};

use super::{Control, StoreError, ViewId};

/// Input rejected before anything is sent to the ledger store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid account type: {0}")]
    InvalidAccountType(String),

    #[error("Invalid transaction kind: {0}")]
    InvalidKind(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Cents, requested: Cents },

    /// The ledger store refused the request. The message is shown as-is.
    #[error("{0}")]
    RemoteRejected(String),

    #[error("Request failed, please retry: {0}")]
    TransportFailure(String),

    #[error("{0} is already in progress")]
    Busy(Control),

    #[error("Account was closed: {0}")]
    AccountClosed(AccountId),

    #[error("Unknown view: {0}")]
    UnknownView(ViewId),
}

impl AppError {
    /// Whether the same request may succeed if the user simply tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransportFailure(_) | AppError::Busy(_))
    }

    /// Whether the error was raised locally without contacting the store.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::InsufficientFunds { .. }
                | AppError::Busy(_)
                | AppError::AccountClosed(_)
                | AppError::UnknownView(_)
        )
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(message) => AppError::RemoteRejected(message),
            StoreError::Transport(source) => AppError::TransportFailure(format!("{:#}", source)),
        }
    }
}
