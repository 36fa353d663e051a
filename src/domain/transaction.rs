use super::account::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Storage-assigned identifier of a logged record.
pub type RecordId = u64;

/// Identifier tying a transaction attempt to its log record and notifications.
///
/// Always of the form `TXN-<uuid v4>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub const PREFIX: &'static str = "TXN-";

    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Transfer,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Success,
    Failed,
}

/// Append-only record of one orchestration attempt.
///
/// Built fully populated through [`Transaction::succeeded`] or
/// [`Transaction::failed`]; the log only ever fills in `record_id`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub record_id: Option<RecordId>,
    pub correlation_id: CorrelationId,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
    pub source_account: Option<String>,
    pub destination_account: Option<String>,
    pub failure_reason: Option<String>,
}

impl Transaction {
    pub fn succeeded(correlation_id: CorrelationId, kind: TransactionKind, amount: Amount) -> Self {
        Self {
            record_id: None,
            correlation_id,
            kind,
            amount,
            timestamp: Utc::now(),
            status: TransactionStatus::Success,
            source_account: None,
            destination_account: None,
            failure_reason: None,
        }
    }

    pub fn failed(
        correlation_id: CorrelationId,
        kind: TransactionKind,
        amount: Amount,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            record_id: None,
            correlation_id,
            kind,
            amount,
            timestamp: Utc::now(),
            status: TransactionStatus::Failed,
            source_account: None,
            destination_account: None,
            failure_reason: Some(reason.into()),
        }
    }

    /// Populates both account fields. Only transfers carry them.
    pub fn between(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.source_account = Some(from.into());
        self.destination_account = Some(to.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }

    /// Whether `account_number` appears as source or destination.
    pub fn involves(&self, account_number: &str) -> bool {
        self.source_account.as_deref() == Some(account_number)
            || self.destination_account.as_deref() == Some(account_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_correlation_id_format() {
        let id = CorrelationId::generate();
        assert!(id.as_str().starts_with("TXN-"));
        assert!(Uuid::parse_str(&id.as_str()[4..]).is_ok());
        assert_ne!(id, CorrelationId::generate());
    }

    #[test]
    fn test_transfer_record_involves_both_accounts() {
        let tx = Transaction::succeeded(
            CorrelationId::generate(),
            TransactionKind::Transfer,
            Amount::new(dec!(10)).unwrap(),
        )
        .between("ACC001", "ACC002");

        assert!(tx.involves("ACC001"));
        assert!(tx.involves("ACC002"));
        assert!(!tx.involves("ACC003"));
    }

    #[test]
    fn test_deposit_record_has_no_accounts() {
        let tx = Transaction::failed(
            CorrelationId::generate(),
            TransactionKind::Deposit,
            Amount::new(dec!(10)).unwrap(),
            "ledger down",
        );
        assert!(!tx.is_success());
        assert!(tx.source_account.is_none());
        assert!(tx.destination_account.is_none());
        assert_eq!(tx.failure_reason.as_deref(), Some("ledger down"));
    }

    #[test]
    fn test_kind_serializes_uppercase() {
        let json = serde_json::to_string(&TransactionKind::Withdraw).unwrap();
        assert_eq!(json, "\"WITHDRAW\"");
        let json = serde_json::to_string(&TransactionStatus::Failed).unwrap();
        assert_eq!(json, "\"FAILED\"");
    }
}
