use super::account::{AccountSnapshot, Balance};
use super::notification::NotificationPayload;
use super::transaction::Transaction;
use crate::error::{LedgerError, NotificationError, StorageError};
use async_trait::async_trait;

/// Remote system of record for account balances.
#[async_trait]
pub trait AccountLedgerClient: Send + Sync {
    async fn get_account(&self, account_number: &str) -> Result<AccountSnapshot, LedgerError>;
    /// Replaces the stored balance unconditionally; there is no version check.
    async fn update_balance(
        &self,
        account_number: &str,
        new_balance: Balance,
    ) -> Result<AccountSnapshot, LedgerError>;
}

/// Best-effort message sink.
#[async_trait]
pub trait NotificationClient: Send + Sync {
    async fn send(&self, payload: NotificationPayload) -> Result<(), NotificationError>;
}

/// Append-only store of transaction records.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Stores `record` and returns it with its storage id assigned.
    async fn append(&self, record: Transaction) -> Result<Transaction, StorageError>;
    /// Records where the account is source or destination, newest first.
    async fn find_by_account(&self, account_number: &str) -> Result<Vec<Transaction>, StorageError>;
}

pub type AccountLedgerBox = Box<dyn AccountLedgerClient>;
pub type NotificationClientBox = Box<dyn NotificationClient>;
pub type TransactionLogBox = Box<dyn TransactionLog>;
