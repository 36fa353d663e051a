use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised to callers of the orchestrator.
///
/// Remote failures never appear here: they are turned into `Failed` records by
/// the fallback path and returned as ordinary results.
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),
    #[error("Cannot transfer to same account: {0}")]
    SameAccountTransfer(String),
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: String,
        balance: Decimal,
        requested: Decimal,
    },
    #[error("Balance of account {account} cannot absorb {amount}: balance {balance}")]
    BalanceOverflow {
        account: String,
        balance: Decimal,
        amount: Decimal,
    },
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Failures reported by the account ledger service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Ledger service unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("Ledger call timed out: {0}")]
    Timeout(String),
    #[error("Invalid ledger response: {0}")]
    InvalidResponse(String),
    #[error("Invalid ledger base URL: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Notification service unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the local transaction log.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::Backend(err.into_string())
    }
}

/// Errors at the CSV boundary of the command-line tool.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed operation: {0}")]
    MalformedOperation(String),
}

pub type Result<T, E = OrchestrationError> = std::result::Result<T, E>;
