#![allow(dead_code)]

use async_trait::async_trait;
use ledgerflow::application::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};
use ledgerflow::application::orchestrator::TransactionOrchestrator;
use ledgerflow::domain::account::{AccountSnapshot, Balance};
use ledgerflow::domain::notification::NotificationPayload;
use ledgerflow::domain::ports::{AccountLedgerClient, NotificationClient, TransactionLog};
use ledgerflow::domain::transaction::Transaction;
use ledgerflow::error::{LedgerError, NotificationError, StorageError};
use ledgerflow::infrastructure::in_memory::{
    InMemoryAccountLedger, InMemoryNotificationClient, InMemoryTransactionLog,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCall {
    Get(String),
    Update(String, Decimal),
}

/// Ledger double recording every call that reaches it, with switchable failures.
#[derive(Clone, Default)]
pub struct SpyLedger {
    inner: InMemoryAccountLedger,
    calls: Arc<Mutex<Vec<LedgerCall>>>,
    unavailable: Arc<AtomicBool>,
    failing_updates: Arc<Mutex<HashSet<String>>>,
    read_delay: Arc<Mutex<Duration>>,
}

impl SpyLedger {
    pub async fn with_accounts(accounts: &[(&str, &str, Decimal)]) -> Self {
        let ledger = Self::default();
        for (number, holder, balance) in accounts {
            ledger
                .inner
                .open_account(AccountSnapshot::new(*number, *holder, *balance))
                .await;
        }
        ledger
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, Decimal)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LedgerCall::Update(account, balance) => Some((account, balance)),
                LedgerCall::Get(_) => None,
            })
            .collect()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_updates_for(&self, account_number: &str) {
        self.failing_updates
            .lock()
            .unwrap()
            .insert(account_number.to_string());
    }

    /// Makes every account read take `delay` before answering.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }

    pub async fn balance(&self, account_number: &str) -> Decimal {
        self.inner
            .get_account(account_number)
            .await
            .unwrap()
            .balance
            .value()
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(LedgerError::RemoteUnavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AccountLedgerClient for SpyLedger {
    async fn get_account(&self, account_number: &str) -> Result<AccountSnapshot, LedgerError> {
        self.calls
            .lock()
            .unwrap()
            .push(LedgerCall::Get(account_number.to_string()));
        self.check_available()?;
        let delay = *self.read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.inner.get_account(account_number).await
    }

    async fn update_balance(
        &self,
        account_number: &str,
        new_balance: Balance,
    ) -> Result<AccountSnapshot, LedgerError> {
        self.calls.lock().unwrap().push(LedgerCall::Update(
            account_number.to_string(),
            new_balance.value(),
        ));
        self.check_available()?;
        if self.failing_updates.lock().unwrap().contains(account_number) {
            return Err(LedgerError::Timeout(format!(
                "update of {account_number} timed out"
            )));
        }
        self.inner.update_balance(account_number, new_balance).await
    }
}

/// Transaction log that cannot persist anything.
#[derive(Clone, Default)]
pub struct FailingLog;

#[async_trait]
impl TransactionLog for FailingLog {
    async fn append(&self, _record: Transaction) -> Result<Transaction, StorageError> {
        Err(StorageError::Backend("disk full".to_string()))
    }

    async fn find_by_account(&self, _account_number: &str) -> Result<Vec<Transaction>, StorageError> {
        Err(StorageError::Backend("disk full".to_string()))
    }
}

/// Notification service that is always down.
#[derive(Clone, Default)]
pub struct DownNotifier;

#[async_trait]
impl NotificationClient for DownNotifier {
    async fn send(&self, _payload: NotificationPayload) -> Result<(), NotificationError> {
        Err(NotificationError::Unavailable("503".to_string()))
    }
}

pub struct Harness {
    pub orchestrator: TransactionOrchestrator,
    pub ledger: SpyLedger,
    pub notifier: InMemoryNotificationClient,
    pub log: InMemoryTransactionLog,
}

pub async fn default_ledger() -> SpyLedger {
    SpyLedger::with_accounts(&[
        ("ACC001", "John Doe", dec!(5000)),
        ("ACC002", "Jane Roe", dec!(3000)),
    ])
    .await
}

pub async fn harness() -> Harness {
    harness_with(CircuitBreakerConfig::default()).await
}

pub async fn harness_with(config: CircuitBreakerConfig) -> Harness {
    let ledger = default_ledger().await;
    let notifier = InMemoryNotificationClient::new();
    let log = InMemoryTransactionLog::new();
    let registry = CircuitBreakerRegistry::new(config);

    let orchestrator = TransactionOrchestrator::new(
        Box::new(ledger.clone()),
        Box::new(notifier.clone()),
        Box::new(log.clone()),
        &registry,
    );

    Harness {
        orchestrator,
        ledger,
        notifier,
        log,
    }
}
