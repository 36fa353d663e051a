use super::transaction::CorrelationId;
use serde::{Deserialize, Serialize};

/// Message handed to the notification service.
///
/// Field names on the wire follow the notification service's contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(rename = "transactionId")]
    pub correlation_id: CorrelationId,
    pub message: String,
    #[serde(rename = "to")]
    pub recipient: String,
}

impl NotificationPayload {
    pub fn new(
        correlation_id: CorrelationId,
        message: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id,
            message: message.into(),
            recipient: recipient.into(),
        }
    }
}
