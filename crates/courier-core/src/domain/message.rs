// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message aggregate and its per-channel results.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::domain::channel::CommonSettings;
use crate::domain::recipient::Recipient;
use crate::error::{CourierError, DeliveryCode, SenderError};
use crate::ids::{ChannelId, MessageId, TemplateId, Timestamp, now_millis};

/// Caller-supplied template variables.
pub type Variables = Map<String, Value>;

/// Overall status of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Success,
    PartialSuccess,
    Failed,
}

impl MessageStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MessageStatus::Pending)
    }
}

/// Outcome of one channel's dispatch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Failed,
}

/// Per-channel replacements applied to a single send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<Recipient>,
    /// Shallow patch merged over the channel's stored config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
}

/// Per-send delivery settings; set fields override the channel's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "retryDelay")]
    pub retry_delay_ms: Option<u64>,
}

impl MessageSettings {
    /// Layers these settings over a channel's settings.
    pub fn effective(&self, base: &CommonSettings) -> CommonSettings {
        CommonSettings {
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
            retry_attempts: self.retry_attempts.unwrap_or(base.retry_attempts),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(base.retry_delay_ms),
        }
    }

    pub fn validate(&self) -> Result<(), CourierError> {
        if self.timeout_ms == Some(0) {
            return Err(CourierError::validation(
                "settings.timeoutMs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Recorded outcome for one channel of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResult {
    pub channel_id: ChannelId,
    pub status: ResultStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<DeliveryCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<Timestamp>,
    #[serde(default)]
    pub attempts: u32,
}

impl MessageResult {
    pub fn success(
        channel_id: ChannelId,
        message: impl Into<String>,
        sent_at: Timestamp,
        attempts: u32,
    ) -> Self {
        Self {
            channel_id,
            status: ResultStatus::Success,
            message: message.into(),
            error_code: None,
            error_details: None,
            sent_at: Some(sent_at),
            attempts,
        }
    }

    pub fn failed(channel_id: ChannelId, error: &SenderError, attempts: u32) -> Self {
        Self {
            channel_id,
            status: ResultStatus::Failed,
            message: format!("delivery failed: {}", error.code),
            error_code: Some(error.code),
            error_details: Some(error.details.clone()),
            sent_at: None,
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// Derives the overall status from per-channel results.
pub fn aggregate_status(results: &[MessageResult]) -> MessageStatus {
    if results.is_empty() {
        return MessageStatus::Pending;
    }
    let successes = results.iter().filter(|r| r.is_success()).count();
    if successes == results.len() {
        MessageStatus::Success
    } else if successes == 0 {
        MessageStatus::Failed
    } else {
        MessageStatus::PartialSuccess
    }
}

/// Removes duplicate channel ids, preserving first occurrence.
pub fn dedupe_channel_ids(ids: &[ChannelId]) -> Vec<ChannelId> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect()
}

/// A single send request fanned out across one or more channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub channel_ids: Vec<ChannelId>,
    pub template_id: TemplateId,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub overrides: BTreeMap<ChannelId, ChannelOverride>,
    #[serde(default)]
    pub settings: MessageSettings,
    pub status: MessageStatus,
    #[serde(default)]
    pub results: Vec<MessageResult>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Message {
    /// A pending message; channel ids are deduplicated and must not be empty.
    pub fn new(channel_ids: &[ChannelId], template_id: TemplateId) -> Result<Self, CourierError> {
        let channel_ids = dedupe_channel_ids(channel_ids);
        if channel_ids.is_empty() {
            return Err(CourierError::validation(
                "channelIds",
                "at least one channel is required",
            ));
        }
        let now = now_millis();
        Ok(Self {
            id: MessageId::new(),
            channel_ids,
            template_id,
            variables: Variables::new(),
            recipients: Vec::new(),
            overrides: BTreeMap::new(),
            settings: MessageSettings::default(),
            status: MessageStatus::Pending,
            results: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_recipients(mut self, recipients: Vec<Recipient>) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn with_overrides(mut self, overrides: BTreeMap<ChannelId, ChannelOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_settings(mut self, settings: MessageSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn result_for(&self, channel_id: &ChannelId) -> Option<&MessageResult> {
        self.results.iter().find(|r| &r.channel_id == channel_id)
    }

    /// Records one channel's outcome.
    ///
    /// Fails for channels outside the message, for a second result on the
    /// same channel, and once the message has reached a terminal status.
    pub fn record_result(&mut self, result: MessageResult) -> Result<(), CourierError> {
        if self.status.is_terminal() {
            return Err(CourierError::conflict(
                "message",
                format!("message {} is already {}", self.id, self.status),
            ));
        }
        if !self.channel_ids.contains(&result.channel_id) {
            return Err(CourierError::validation(
                "channelId",
                format!("channel {} is not part of message {}", result.channel_id, self.id),
            ));
        }
        if self.result_for(&result.channel_id).is_some() {
            return Err(CourierError::conflict(
                "message_result",
                format!("result for channel {} already recorded", result.channel_id),
            ));
        }
        self.results.push(result);
        self.updated_at = now_millis().max(self.updated_at);
        Ok(())
    }

    /// Settles the status from the recorded results.
    pub fn finalize(&mut self) -> MessageStatus {
        if !self.status.is_terminal() {
            self.status = aggregate_status(&self.results);
            self.updated_at = now_millis().max(self.updated_at);
        }
        self.status
    }
}
