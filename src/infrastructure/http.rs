//! HTTP adapters for the account ledger and notification services.
//!
//! Routes:
//! - `GET  {ledger}/api/accounts/{accountNumber}`
//! - `PUT  {ledger}/api/accounts/{accountNumber}/balance` with `{"balance": <number>}`
//! - `POST {notifier}/api/notifications/send` with `{"transactionId", "message", "to"}`

use crate::domain::account::{AccountSnapshot, Balance};
use crate::domain::notification::NotificationPayload;
use crate::domain::ports::{AccountLedgerClient, NotificationClient};
use crate::error::{LedgerError, NotificationError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct BalanceUpdate {
    #[serde(with = "rust_decimal::serde::float")]
    balance: Decimal,
}

fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

fn transport_error(err: reqwest::Error) -> LedgerError {
    if err.is_timeout() {
        LedgerError::Timeout(err.to_string())
    } else {
        LedgerError::RemoteUnavailable(err.to_string())
    }
}

/// Ledger client speaking the account service's REST API.
///
/// The per-request timeout is the only timeout applied to ledger calls.
#[derive(Clone)]
pub struct HttpAccountLedgerClient {
    base_url: Url,
    client: Client,
}

impl HttpAccountLedgerClient {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, LedgerError> {
        let base_url = base_url.as_ref();
        let parsed = Url::parse(base_url)
            .map_err(|err| LedgerError::InvalidBaseUrl(format!("{base_url}: {err}")))?;
        if parsed.cannot_be_a_base() {
            return Err(LedgerError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = build_client(timeout).map_err(transport_error)?;
        Ok(Self {
            base_url: parsed,
            client,
        })
    }

    /// `{base}/api/accounts/{accountNumber}[/{suffix}]`, with the account
    /// number percent-encoded as a single path segment.
    fn account_url(&self, account_number: &str, suffix: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "accounts", account_number])
                .extend(suffix);
        }
        url
    }

    async fn read_snapshot(
        account_number: &str,
        response: Response,
    ) -> Result<AccountSnapshot, LedgerError> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(LedgerError::AccountNotFound(account_number.to_string())),
            status if status.is_success() => {
                response.json::<AccountSnapshot>().await.map_err(|err| {
                    if err.is_timeout() {
                        LedgerError::Timeout(err.to_string())
                    } else {
                        LedgerError::InvalidResponse(err.to_string())
                    }
                })
            }
            status => Err(LedgerError::RemoteUnavailable(format!(
                "ledger responded with {status}"
            ))),
        }
    }
}

#[async_trait]
impl AccountLedgerClient for HttpAccountLedgerClient {
    async fn get_account(&self, account_number: &str) -> Result<AccountSnapshot, LedgerError> {
        let response = self
            .client
            .get(self.account_url(account_number, None))
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_snapshot(account_number, response).await
    }

    async fn update_balance(
        &self,
        account_number: &str,
        new_balance: Balance,
    ) -> Result<AccountSnapshot, LedgerError> {
        let response = self
            .client
            .put(self.account_url(account_number, Some("balance")))
            .json(&BalanceUpdate {
                balance: new_balance.value(),
            })
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_snapshot(account_number, response).await
    }
}

/// Notification client posting to the notification service.
#[derive(Clone)]
pub struct HttpNotificationClient {
    base_url: String,
    client: Client,
}

impl HttpNotificationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NotificationError> {
        let client =
            build_client(timeout).map_err(|err| NotificationError::Unavailable(err.to_string()))?;
        Ok(Self {
            base_url: trim_base_url(base_url),
            client,
        })
    }
}

#[async_trait]
impl NotificationClient for HttpNotificationClient {
    async fn send(&self, payload: NotificationPayload) -> Result<(), NotificationError> {
        self.client
            .post(format!("{}/api/notifications/send", self.base_url))
            .json(&payload)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|err| NotificationError::Unavailable(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_update_is_a_json_number() {
        let body = serde_json::to_value(BalanceUpdate {
            balance: dec!(6000.5),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "balance": 6000.5 }));
    }

    #[test]
    fn test_account_url_trims_trailing_slash() {
        let client =
            HttpAccountLedgerClient::new("http://ledger:8081/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.account_url("ACC001", None).as_str(),
            "http://ledger:8081/api/accounts/ACC001"
        );
        assert_eq!(
            client.account_url("ACC001", Some("balance")).as_str(),
            "http://ledger:8081/api/accounts/ACC001/balance"
        );
    }

    #[test]
    fn test_account_url_keeps_base_path() {
        let client =
            HttpAccountLedgerClient::new("http://gateway/ledger", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.account_url("ACC001", None).as_str(),
            "http://gateway/ledger/api/accounts/ACC001"
        );
    }

    #[test]
    fn test_account_number_is_encoded_as_one_segment() {
        let client =
            HttpAccountLedgerClient::new("http://ledger:8081", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.account_url("ACC/1?x#y", Some("balance")).as_str(),
            "http://ledger:8081/api/accounts/ACC%2F1%3Fx%23y/balance"
        );
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(
            HttpAccountLedgerClient::new("not a url", Duration::from_secs(1)),
            Err(LedgerError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            HttpAccountLedgerClient::new("mailto:ledger@example.com", Duration::from_secs(1)),
            Err(LedgerError::InvalidBaseUrl(_))
        ));
    }
}
