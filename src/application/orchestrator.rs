use super::circuit_breaker::{
    ACCOUNT_SERVICE_CB, CircuitBreaker, CircuitBreakerError, CircuitBreakerRegistry,
};
use crate::domain::account::{AccountSnapshot, Amount, Balance};
use crate::domain::notification::NotificationPayload;
use crate::domain::ports::{AccountLedgerBox, NotificationClientBox, TransactionLogBox};
use crate::domain::transaction::{CorrelationId, Transaction, TransactionKind};
use crate::error::{LedgerError, OrchestrationError, Result};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// A money-movement request, as accepted by [`TransactionOrchestrator::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Deposit {
        account: String,
        amount: Decimal,
    },
    Withdraw {
        account: String,
        amount: Decimal,
    },
    Transfer {
        from: String,
        to: String,
        amount: Decimal,
    },
}

type GuardedError = CircuitBreakerError<LedgerError>;

/// Why a breaker-guarded ledger sequence stopped before completing.
enum Interrupted {
    /// Local validation failed after a balance read; raised to the caller.
    Rejected(OrchestrationError),
    /// A guarded call failed or was short-circuited; handled by a fallback.
    Remote(GuardedError),
}

impl From<GuardedError> for Interrupted {
    fn from(err: GuardedError) -> Self {
        Interrupted::Remote(err)
    }
}

/// Coordinates deposits, withdrawals and transfers across the ledger service,
/// the local transaction log and the notification service.
///
/// Every ledger call goes through the `accountServiceCB` circuit breaker.
/// Validation failures are returned as errors. Remote failures are not: they
/// produce a `Failed` record which is logged and returned like any other
/// result, so callers must inspect `status`.
///
/// Operations are not atomic. In particular a transfer debits and credits
/// with two independent ledger writes and never compensates: if the credit
/// fails after the debit succeeded, the debit stays applied and the attempt
/// is only visible as a `Failed` record.
pub struct TransactionOrchestrator {
    ledger: AccountLedgerBox,
    notifier: NotificationClientBox,
    log: TransactionLogBox,
    breaker: Arc<CircuitBreaker>,
}

impl TransactionOrchestrator {
    pub fn new(
        ledger: AccountLedgerBox,
        notifier: NotificationClientBox,
        log: TransactionLogBox,
        breakers: &CircuitBreakerRegistry,
    ) -> Self {
        Self {
            ledger,
            notifier,
            log,
            breaker: breakers.breaker(ACCOUNT_SERVICE_CB),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn execute(&self, operation: Operation) -> Result<Transaction> {
        match operation {
            Operation::Deposit { account, amount } => self.deposit(&account, amount).await,
            Operation::Withdraw { account, amount } => self.withdraw(&account, amount).await,
            Operation::Transfer { from, to, amount } => self.transfer(&from, &to, amount).await,
        }
    }

    pub async fn deposit(&self, account_number: &str, amount: Decimal) -> Result<Transaction> {
        let amount = Amount::new(amount)?;
        let correlation_id = CorrelationId::generate();

        match self.credit(account_number, amount).await {
            Ok(account) => {
                let record = self
                    .log
                    .append(Transaction::succeeded(
                        correlation_id,
                        TransactionKind::Deposit,
                        amount,
                    ))
                    .await?;
                self.notify(
                    &record.correlation_id,
                    format!("Deposit of {amount} completed."),
                    &account.holder_name,
                )
                .await;
                tracing::info!(correlation_id = %record.correlation_id, account = account_number, %amount, "Deposit completed");
                Ok(record)
            }
            Err(Interrupted::Rejected(err)) => Err(err),
            Err(Interrupted::Remote(cause)) => {
                self.fallback_transaction(
                    correlation_id,
                    TransactionKind::Deposit,
                    account_number,
                    amount,
                    cause,
                )
                .await
            }
        }
    }

    pub async fn withdraw(&self, account_number: &str, amount: Decimal) -> Result<Transaction> {
        let amount = Amount::new(amount)?;
        let correlation_id = CorrelationId::generate();

        match self.debit(account_number, amount).await {
            Ok(account) => {
                let record = self
                    .log
                    .append(Transaction::succeeded(
                        correlation_id,
                        TransactionKind::Withdraw,
                        amount,
                    ))
                    .await?;
                self.notify(
                    &record.correlation_id,
                    format!("Withdrawal of {amount} completed."),
                    &account.holder_name,
                )
                .await;
                tracing::info!(correlation_id = %record.correlation_id, account = account_number, %amount, "Withdrawal completed");
                Ok(record)
            }
            Err(Interrupted::Rejected(err)) => Err(err),
            Err(Interrupted::Remote(cause)) => {
                self.fallback_transaction(
                    correlation_id,
                    TransactionKind::Withdraw,
                    account_number,
                    amount,
                    cause,
                )
                .await
            }
        }
    }

    pub async fn transfer(
        &self,
        from_account: &str,
        to_account: &str,
        amount: Decimal,
    ) -> Result<Transaction> {
        let amount = Amount::new(amount)?;
        if from_account == to_account {
            return Err(OrchestrationError::SameAccountTransfer(
                from_account.to_string(),
            ));
        }
        let correlation_id = CorrelationId::generate();

        match self.move_funds(from_account, to_account, amount).await {
            Ok((source, destination)) => {
                let record = self
                    .log
                    .append(
                        Transaction::succeeded(correlation_id, TransactionKind::Transfer, amount)
                            .between(from_account, to_account),
                    )
                    .await?;
                self.notify(
                    &record.correlation_id,
                    format!("You sent {amount} to {to_account}"),
                    &source.holder_name,
                )
                .await;
                self.notify(
                    &record.correlation_id,
                    format!("You received {amount} from {from_account}"),
                    &destination.holder_name,
                )
                .await;
                tracing::info!(
                    correlation_id = %record.correlation_id,
                    from = from_account,
                    to = to_account,
                    %amount,
                    "Transfer completed"
                );
                Ok(record)
            }
            Err(Interrupted::Rejected(err)) => Err(err),
            Err(Interrupted::Remote(cause)) => {
                self.fallback_transfer(correlation_id, from_account, to_account, amount, cause)
                    .await
            }
        }
    }

    /// All logged records where the account is source or destination, newest first.
    pub async fn history(&self, account_number: &str) -> Result<Vec<Transaction>> {
        Ok(self.log.find_by_account(account_number).await?)
    }

    /// Terminal handling of a failed deposit or withdrawal.
    ///
    /// Logs and returns a `Failed` record without account fields. No retry and
    /// no notification. Fails only if the record cannot be appended.
    pub async fn fallback_transaction(
        &self,
        correlation_id: CorrelationId,
        kind: TransactionKind,
        account_number: &str,
        amount: Amount,
        cause: impl fmt::Display,
    ) -> Result<Transaction> {
        tracing::warn!(%correlation_id, ?kind, account = account_number, %amount, %cause, "Ledger call failed, recording failed transaction");
        let record = Transaction::failed(correlation_id, kind, amount, cause.to_string());
        Ok(self.log.append(record).await?)
    }

    /// Terminal handling of a failed transfer. Like [`Self::fallback_transaction`]
    /// but the record names both accounts.
    pub async fn fallback_transfer(
        &self,
        correlation_id: CorrelationId,
        from_account: &str,
        to_account: &str,
        amount: Amount,
        cause: impl fmt::Display,
    ) -> Result<Transaction> {
        tracing::warn!(%correlation_id, from = from_account, to = to_account, %amount, %cause, "Ledger call failed, recording failed transfer");
        let record = Transaction::failed(
            correlation_id,
            TransactionKind::Transfer,
            amount,
            cause.to_string(),
        )
        .between(from_account, to_account);
        Ok(self.log.append(record).await?)
    }

    async fn credit(
        &self,
        account_number: &str,
        amount: Amount,
    ) -> Result<AccountSnapshot, Interrupted> {
        let account = self.fetch(account_number).await?;
        let new_balance = credited(&account, amount)?;
        self.write(account_number, new_balance).await?;
        Ok(account)
    }

    async fn debit(
        &self,
        account_number: &str,
        amount: Amount,
    ) -> Result<AccountSnapshot, Interrupted> {
        let account = self.fetch(account_number).await?;
        let new_balance = debited(&account, amount)?;
        self.write(account_number, new_balance).await?;
        Ok(account)
    }

    async fn move_funds(
        &self,
        from_account: &str,
        to_account: &str,
        amount: Amount,
    ) -> Result<(AccountSnapshot, AccountSnapshot), Interrupted> {
        let source = self.fetch(from_account).await?;
        let destination = self.fetch(to_account).await?;
        let source_balance = debited(&source, amount)?;
        let destination_balance = credited(&destination, amount)?;

        self.write(from_account, source_balance).await?;
        // A failure here leaves the debit above in place.
        self.write(to_account, destination_balance).await?;
        Ok((source, destination))
    }

    async fn fetch(&self, account_number: &str) -> Result<AccountSnapshot, GuardedError> {
        tracing::debug!(account = account_number, "Fetching account from ledger");
        self.breaker
            .call(|| self.ledger.get_account(account_number))
            .await
    }

    async fn write(
        &self,
        account_number: &str,
        new_balance: Balance,
    ) -> Result<AccountSnapshot, GuardedError> {
        tracing::debug!(account = account_number, %new_balance, "Updating ledger balance");
        self.breaker
            .call(|| self.ledger.update_balance(account_number, new_balance))
            .await
    }

    async fn notify(&self, correlation_id: &CorrelationId, message: String, recipient: &str) {
        let payload = NotificationPayload::new(correlation_id.clone(), message, recipient);
        if let Err(err) = self.notifier.send(payload).await {
            tracing::warn!(%correlation_id, recipient, error = %err, "Notification not delivered");
        }
    }
}

fn debited(account: &AccountSnapshot, amount: Amount) -> Result<Balance, Interrupted> {
    if !account.balance.covers(amount) {
        return Err(Interrupted::Rejected(OrchestrationError::InsufficientFunds {
            account: account.account_number.clone(),
            balance: account.balance.value(),
            requested: amount.value(),
        }));
    }
    account
        .balance
        .checked_sub(amount)
        .ok_or_else(|| overflow(account, amount))
}

fn credited(account: &AccountSnapshot, amount: Amount) -> Result<Balance, Interrupted> {
    account
        .balance
        .checked_add(amount)
        .ok_or_else(|| overflow(account, amount))
}

fn overflow(account: &AccountSnapshot, amount: Amount) -> Interrupted {
    Interrupted::Rejected(OrchestrationError::BalanceOverflow {
        account: account.account_number.clone(),
        balance: account.balance.value(),
        amount: amount.value(),
    })
}
