// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack channel type using incoming webhooks.
//!
//! Every recipient target is a Slack channel name; one webhook post is made
//! per recipient. A non-empty subject is rendered as a bold first line.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::traits::{ChannelType, Sender};
use courier_core::{
    Channel, Context, CourierError, DeliveryCode, Recipient, RenderedContent, SendReceipt,
    SenderError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

#[derive(Clone, Deserialize)]
pub struct SlackChannelConfig {
    pub webhook_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub icon_emoji: Option<String>,
}

impl std::fmt::Debug for SlackChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The webhook URL embeds its secret.
        f.debug_struct("SlackChannelConfig")
            .field("webhook_url", &"[REDACTED]")
            .field("username", &self.username)
            .field("icon_emoji", &self.icon_emoji)
            .finish()
    }
}

impl SlackChannelConfig {
    pub fn from_map(config: &Map<String, Value>) -> Result<Self, SenderError> {
        serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| SenderError::internal(format!("invalid slack config: {e}")))
    }
}

/// Body of an incoming-webhook post.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: String,
    channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<&'a str>,
}

/// Joins subject and body into Slack mrkdwn.
pub fn format_text(content: &RenderedContent) -> String {
    let subject = content.subject.trim();
    if subject.is_empty() {
        content.body.clone()
    } else {
        format!("*{subject}*\n{}", content.body)
    }
}

/// The `slack` channel type.
#[derive(Debug, Default)]
pub struct SlackChannelType;

impl SlackChannelType {
    pub fn new() -> Self {
        Self
    }
}

impl ChannelType for SlackChannelType {
    fn name(&self) -> &str {
        "slack"
    }

    fn display_name(&self) -> &str {
        "Slack"
    }

    fn description(&self) -> &str {
        "Posts to Slack channels through an incoming webhook"
    }

    fn config_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["webhook_url"],
            "additionalProperties": false,
            "properties": {
                "webhook_url": {"type": "string", "pattern": "^https?://"},
                "username": {"type": "string"},
                "icon_emoji": {"type": "string"}
            }
        })
    }

    fn create_sender(&self, timeout: Duration) -> Result<Arc<dyn Sender>, CourierError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CourierError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Arc::new(SlackSender { http }))
    }
}

#[derive(Debug)]
pub struct SlackSender {
    http: reqwest::Client,
}

impl SlackSender {
    async fn post(&self, url: &str, payload: &WebhookPayload<'_>) -> Result<(), SenderError> {
        let response = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify_request_error(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "slack webhook rejected post");
        let details = if body.is_empty() {
            format!("slack returned {status}")
        } else {
            format!("slack returned {status}: {body}")
        };
        Err(SenderError::from_http_status(status.as_u16(), details))
    }
}

#[async_trait]
impl Sender for SlackSender {
    /// Succeeds when at least one post was accepted.
    async fn send(
        &self,
        ctx: &Context,
        channel: &Channel,
        content: &RenderedContent,
        recipients: &[Recipient],
    ) -> Result<SendReceipt, SenderError> {
        let config = SlackChannelConfig::from_map(&channel.config)?;
        let text = format_text(content);
        let mut posted = 0usize;
        let mut first_error = None;

        for recipient in recipients {
            if ctx.is_cancelled() {
                return Err(SenderError::canceled());
            }
            let payload = WebhookPayload {
                text: text.clone(),
                channel: &recipient.target,
                username: config.username.as_deref(),
                icon_emoji: config.icon_emoji.as_deref(),
            };
            match self.post(&config.webhook_url, &payload).await {
                Ok(()) => posted += 1,
                Err(e) => {
                    warn!(channel_id = %channel.id, target = %recipient.target, error = %e, "slack post failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if posted == 0 {
            return Err(first_error
                .unwrap_or_else(|| SenderError::new(DeliveryCode::NoRecipients, "no recipients")));
        }
        info!(channel_id = %channel.id, posted, total = recipients.len(), "slack message posted");
        Ok(SendReceipt::new(format!(
            "posted to {posted}/{} slack channel(s)",
            recipients.len()
        )))
    }
}

fn classify_request_error(err: &reqwest::Error) -> SenderError {
    if err.is_timeout() {
        SenderError::timeout(format!("slack webhook timed out: {err}"))
    } else if err.is_connect() || err.is_request() {
        SenderError::transport(format!("slack webhook unreachable: {err}"))
    } else {
        SenderError::unknown(format!("slack webhook failed: {err}"))
    }
}
