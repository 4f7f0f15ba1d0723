// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Value types exchanged between the pipeline and channel senders.

use serde::{Deserialize, Serialize};

use crate::error::{DeliveryCode, SenderError};
use crate::ids::{Timestamp, now_millis};

/// Subject and body after variable substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedContent {
    /// Empty when the template has no subject.
    pub subject: String,
    pub body: String,
}

/// What a sender reports after a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub message: String,
    /// Provider-side identifier (SMTP queue id, Twilio SID, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub sent_at: Timestamp,
}

impl SendReceipt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            provider_id: None,
            sent_at: now_millis(),
        }
    }

    pub fn with_provider_id(mut self, id: impl Into<String>) -> Self {
        self.provider_id = Some(id.into());
        self
    }
}

/// Normalized outcome of one sender call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<DeliveryCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<Timestamp>,
}

impl From<&Result<SendReceipt, SenderError>> for SendResult {
    fn from(outcome: &Result<SendReceipt, SenderError>) -> Self {
        match outcome {
            Ok(receipt) => SendResult {
                success: true,
                message: receipt.message.clone(),
                error_code: None,
                sent_at: Some(receipt.sent_at),
            },
            Err(err) => SendResult {
                success: false,
                message: err.details.clone(),
                error_code: Some(err.code),
                sent_at: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_result_normalizes_both_arms() {
        let ok: Result<SendReceipt, SenderError> = Ok(SendReceipt::new("queued"));
        let res = SendResult::from(&ok);
        assert!(res.success);
        assert!(res.sent_at.is_some());

        let failed: Result<SendReceipt, SenderError> = Err(SenderError::auth("401"));
        let res = SendResult::from(&failed);
        assert!(!res.success);
        assert_eq!(res.error_code, Some(DeliveryCode::Auth));
    }
}
