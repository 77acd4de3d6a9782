use miette::Diagnostic;
use rust_decimal::Decimal;
use thiserror::Error;

/// How an outer transport layer should surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wallet absent or not owned by the acting principal (404-equivalent).
    NotFound,
    /// Domain rule violation the caller can fix (400-equivalent).
    Rejected,
    /// Opaque storage or runtime failure (500-equivalent).
    Infrastructure,
}

#[derive(Error, Debug, Diagnostic)]
pub enum WalletError {
    #[error("Wallet not found")]
    #[diagnostic(code(wallet::not_found))]
    NotFound,
    #[error("Insufficient balance: available {available}, requested {requested}")]
    #[diagnostic(code(wallet::insufficient_balance))]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },
    #[error("Validation error: {0}")]
    #[diagnostic(code(wallet::validation))]
    ValidationError(String),
    #[error("Ledger entry {0} already exists")]
    #[diagnostic(code(wallet::duplicate_entry))]
    DuplicateEntry(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-postgres")]
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl WalletError {
    pub fn internal(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::InternalError(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::NotFound => ErrorKind::NotFound,
            WalletError::InsufficientBalance { .. } | WalletError::ValidationError(_) => {
                ErrorKind::Rejected
            }
            _ => ErrorKind::Infrastructure,
        }
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
