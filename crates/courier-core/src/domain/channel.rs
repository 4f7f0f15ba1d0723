// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel configuration entity.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::recipient::Recipient;
use crate::error::CourierError;
use crate::ids::{ChannelId, TemplateId, Timestamp, now_millis};

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_enabled() -> bool {
    true
}

/// Delivery settings shared by every channel type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonSettings {
    /// Budget for one dispatch, retries included.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra attempts after the first failure.
    #[serde(default)]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_attempts: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl CommonSettings {
    pub fn validate(&self) -> Result<(), CourierError> {
        if self.timeout_ms == 0 {
            return Err(CourierError::validation(
                "settings.timeoutMs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// A configured delivery endpoint of a registered channel type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub channel_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,
    #[serde(default)]
    pub settings: CommonSettings,
    /// Type-specific configuration, validated by the channel type.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Default recipients merged into every send.
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Channel {
    /// A new enabled channel with default settings and a fresh id.
    pub fn new(name: impl Into<String>, channel_type: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: ChannelId::new(),
            name: name.into(),
            description: None,
            enabled: true,
            channel_type: channel_type.into(),
            template_id: None,
            settings: CommonSettings::default(),
            config: Map::new(),
            recipients: Vec::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    pub fn with_recipients(mut self, recipients: Vec<Recipient>) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn with_template(mut self, template_id: TemplateId) -> Self {
        self.template_id = Some(template_id);
        self
    }

    pub fn with_settings(mut self, settings: CommonSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Soft-deletes the channel in place.
    pub fn mark_deleted(&mut self) {
        let now = now_millis();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// Returns a copy with the patch applied and `updated_at` bumped.
    ///
    /// The patch's `channel_type` is copied as-is; rejecting a type change is
    /// the validator's job.
    pub fn apply(&self, patch: &ChannelPatch) -> Channel {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(description) = &patch.description {
            next.description = Some(description.clone());
        }
        if let Some(enabled) = patch.enabled {
            next.enabled = enabled;
        }
        if let Some(channel_type) = &patch.channel_type {
            next.channel_type = channel_type.clone();
        }
        if patch.clear_template {
            next.template_id = None;
        }
        if let Some(template_id) = &patch.template_id {
            next.template_id = Some(template_id.clone());
        }
        if let Some(settings) = &patch.settings {
            next.settings = settings.clone();
        }
        if let Some(config) = &patch.config {
            next.config = config.clone();
        }
        if let Some(recipients) = &patch.recipients {
            next.recipients = recipients.clone();
        }
        if let Some(tags) = &patch.tags {
            next.tags = tags.clone();
        }
        next.updated_at = now_millis().max(self.updated_at);
        next
    }
}

/// Replacement values for a channel update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    /// Present only to be rejected when it differs from the stored type.
    pub channel_type: Option<String>,
    pub template_id: Option<TemplateId>,
    /// Detaches the default template.
    pub clear_template: bool,
    pub settings: Option<CommonSettings>,
    pub config: Option<Map<String, Value>>,
    pub recipients: Option<Vec<Recipient>>,
    pub tags: Option<Vec<String>>,
}

impl ChannelPatch {
    pub fn is_empty(&self) -> bool {
        *self == ChannelPatch::default()
    }
}
