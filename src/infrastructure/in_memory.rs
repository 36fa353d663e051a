use super::newest_first;
use crate::domain::account::{AccountSnapshot, Balance};
use crate::domain::notification::NotificationPayload;
use crate::domain::ports::{AccountLedgerClient, NotificationClient, TransactionLog};
use crate::domain::transaction::Transaction;
use crate::error::{LedgerError, NotificationError, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory stand-in for the account ledger service.
///
/// Uses `Arc<RwLock<HashMap<String, AccountSnapshot>>>` so clones share the
/// same accounts. Backs the command-line tool when no ledger URL is configured.
#[derive(Default, Clone)]
pub struct InMemoryAccountLedger {
    accounts: Arc<RwLock<HashMap<String, AccountSnapshot>>>,
}

impl InMemoryAccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the account, replacing any existing one with the same number.
    pub async fn open_account(&self, account: AccountSnapshot) {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.account_number.clone(), account);
    }
}

#[async_trait]
impl AccountLedgerClient for InMemoryAccountLedger {
    async fn get_account(&self, account_number: &str) -> Result<AccountSnapshot, LedgerError> {
        let accounts = self.accounts.read().await;
        accounts
            .get(account_number)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(account_number.to_string()))
    }

    async fn update_balance(
        &self,
        account_number: &str,
        new_balance: Balance,
    ) -> Result<AccountSnapshot, LedgerError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(account_number)
            .ok_or_else(|| LedgerError::AccountNotFound(account_number.to_string()))?;
        account.balance = new_balance;
        Ok(account.clone())
    }
}

/// Notification sink that logs every message and keeps it in an outbox.
#[derive(Default, Clone)]
pub struct InMemoryNotificationClient {
    outbox: Arc<RwLock<Vec<NotificationPayload>>>,
}

impl InMemoryNotificationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, in sending order.
    pub async fn sent(&self) -> Vec<NotificationPayload> {
        self.outbox.read().await.clone()
    }
}

#[async_trait]
impl NotificationClient for InMemoryNotificationClient {
    async fn send(&self, payload: NotificationPayload) -> Result<(), NotificationError> {
        tracing::info!(
            "NOTIFICATION: txn={} message='{}' to={}",
            payload.correlation_id,
            payload.message,
            payload.recipient
        );
        self.outbox.write().await.push(payload);
        Ok(())
    }
}

/// A thread-safe in-memory transaction log.
///
/// Records are kept in insertion order; record ids start at 1.
#[derive(Default, Clone)]
pub struct InMemoryTransactionLog {
    records: Arc<RwLock<Vec<Transaction>>>,
}

impl InMemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record, in insertion order.
    pub async fn records(&self) -> Vec<Transaction> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl TransactionLog for InMemoryTransactionLog {
    async fn append(&self, mut record: Transaction) -> Result<Transaction, StorageError> {
        let mut records = self.records.write().await;
        record.record_id = Some(records.len() as u64 + 1);
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_account(&self, account_number: &str) -> Result<Vec<Transaction>, StorageError> {
        let records = self.records.read().await;
        let mut matching: Vec<Transaction> = records
            .iter()
            .filter(|record| record.involves(account_number))
            .cloned()
            .collect();
        newest_first(&mut matching);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Amount;
    use crate::domain::transaction::{CorrelationId, TransactionKind};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn transfer(from: &str, to: &str) -> Transaction {
        Transaction::succeeded(
            CorrelationId::generate(),
            TransactionKind::Transfer,
            Amount::new(dec!(1)).unwrap(),
        )
        .between(from, to)
    }

    #[tokio::test]
    async fn test_in_memory_ledger() {
        let ledger = InMemoryAccountLedger::new();
        ledger
            .open_account(AccountSnapshot::new("ACC001", "John Doe", dec!(100)))
            .await;

        let updated = ledger
            .update_balance("ACC001", Balance::new(dec!(42)))
            .await
            .unwrap();
        assert_eq!(updated.balance, Balance::new(dec!(42)));
        assert_eq!(
            ledger.get_account("ACC001").await.unwrap().balance,
            Balance::new(dec!(42))
        );

        assert_eq!(
            ledger.get_account("ACC002").await,
            Err(LedgerError::AccountNotFound("ACC002".to_string()))
        );
        assert!(ledger.update_balance("ACC002", Balance::ZERO).await.is_err());
    }

    #[tokio::test]
    async fn test_in_memory_log_assigns_ids() {
        let log = InMemoryTransactionLog::new();

        let first = log.append(transfer("A", "B")).await.unwrap();
        let second = log.append(transfer("B", "C")).await.unwrap();

        assert_eq!(first.record_id, Some(1));
        assert_eq!(second.record_id, Some(2));
        assert_eq!(log.records().await.len(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_log_find_by_account_newest_first() {
        let log = InMemoryTransactionLog::new();
        let now = Utc::now();

        let mut older = transfer("A", "B");
        older.timestamp = now - Duration::seconds(10);
        let mut newer = transfer("C", "A");
        newer.timestamp = now;

        log.append(older).await.unwrap();
        log.append(transfer("C", "D")).await.unwrap();
        log.append(newer).await.unwrap();

        let history = log.find_by_account("A").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].source_account.as_deref(), Some("C"));
        assert_eq!(history[1].source_account.as_deref(), Some("A"));

        assert!(log.find_by_account("Z").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_outbox_keeps_order() {
        let notifier = InMemoryNotificationClient::new();
        let id = CorrelationId::generate();

        notifier
            .send(NotificationPayload::new(id.clone(), "first", "John"))
            .await
            .unwrap();
        notifier
            .send(NotificationPayload::new(id, "second", "Jane"))
            .await
            .unwrap();

        let sent = notifier.sent().await;
        assert_eq!(sent[0].message, "first");
        assert_eq!(sent[1].recipient, "Jane");
    }
}
