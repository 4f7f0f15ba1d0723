// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS channel type backed by the Twilio Messages API.
//!
//! Each recipient gets its own API request carrying the rendered body; the
//! subject is not used.

mod client;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::traits::{ChannelType, Sender};
use courier_core::{
    Channel, Context, CourierError, DeliveryCode, Recipient, RenderedContent, SendReceipt,
    SenderError,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

pub use client::TwilioClient;

/// Production Twilio endpoint.
pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Clone, Deserialize)]
pub struct SmsChannelConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    #[serde(default = "default_api_base")]
    pub api_base_url: String,
}

fn default_api_base() -> String {
    TWILIO_API_BASE.to_string()
}

impl std::fmt::Debug for SmsChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsChannelConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from", &self.from)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl SmsChannelConfig {
    pub fn from_map(config: &Map<String, Value>) -> Result<Self, SenderError> {
        serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| SenderError::internal(format!("invalid sms config: {e}")))
    }
}

/// The `sms` channel type.
#[derive(Debug, Default)]
pub struct SmsChannelType;

impl SmsChannelType {
    pub fn new() -> Self {
        Self
    }
}

impl ChannelType for SmsChannelType {
    fn name(&self) -> &str {
        "sms"
    }

    fn display_name(&self) -> &str {
        "SMS"
    }

    fn description(&self) -> &str {
        "Sends text messages through Twilio"
    }

    fn config_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["account_sid", "auth_token", "from"],
            "additionalProperties": false,
            "properties": {
                "account_sid": {"type": "string", "minLength": 1},
                "auth_token": {"type": "string", "minLength": 1},
                "from": {"type": "string", "minLength": 1},
                "api_base_url": {"type": "string", "pattern": "^https?://"}
            }
        })
    }

    fn create_sender(&self, timeout: Duration) -> Result<Arc<dyn Sender>, CourierError> {
        Ok(Arc::new(SmsSender {
            client: TwilioClient::new(timeout)?,
        }))
    }
}

/// Delivers the body to every recipient, one request each.
#[derive(Debug)]
pub struct SmsSender {
    client: TwilioClient,
}

#[async_trait]
impl Sender for SmsSender {
    /// Succeeds when at least one recipient was accepted; fails with the
    /// first error when none were.
    async fn send(
        &self,
        ctx: &Context,
        channel: &Channel,
        content: &RenderedContent,
        recipients: &[Recipient],
    ) -> Result<SendReceipt, SenderError> {
        let config = SmsChannelConfig::from_map(&channel.config)?;
        let mut sids = Vec::with_capacity(recipients.len());
        let mut first_error = None;

        for recipient in recipients {
            if ctx.is_cancelled() {
                return Err(SenderError::canceled());
            }
            match self.client.send(&config, &recipient.target, &content.body).await {
                Ok(sid) => sids.push(sid),
                Err(e) => {
                    warn!(channel_id = %channel.id, to = %recipient.target, error = %e, "sms rejected");
                    first_error.get_or_insert(e);
                }
            }
        }

        if sids.is_empty() {
            return Err(first_error
                .unwrap_or_else(|| SenderError::new(DeliveryCode::NoRecipients, "no recipients")));
        }
        info!(channel_id = %channel.id, sent = sids.len(), total = recipients.len(), "sms sent");
        Ok(
            SendReceipt::new(format!("sms sent to {}/{} recipient(s)", sids.len(), recipients.len()))
                .with_provider_id(sids.join(",")),
        )
    }
}
