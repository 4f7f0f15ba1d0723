// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain events published after successful commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::ids::{RequestId, Timestamp, now_millis};

/// Every event type the service can publish.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum EventType {
    #[strum(serialize = "channel.created")]
    #[serde(rename = "channel.created")]
    ChannelCreated,
    #[strum(serialize = "channel.updated")]
    #[serde(rename = "channel.updated")]
    ChannelUpdated,
    #[strum(serialize = "channel.deleted")]
    #[serde(rename = "channel.deleted")]
    ChannelDeleted,
    #[strum(serialize = "template.created")]
    #[serde(rename = "template.created")]
    TemplateCreated,
    #[strum(serialize = "template.updated")]
    #[serde(rename = "template.updated")]
    TemplateUpdated,
    #[strum(serialize = "template.deleted")]
    #[serde(rename = "template.deleted")]
    TemplateDeleted,
    #[strum(serialize = "message.sent")]
    #[serde(rename = "message.sent")]
    MessageSent,
    #[strum(serialize = "message.failed")]
    #[serde(rename = "message.failed")]
    MessageFailed,
    /// Reserved for provider delivery receipts; never emitted.
    #[strum(serialize = "message.delivered")]
    #[serde(rename = "message.delivered")]
    MessageDelivered,
}

/// Kind of aggregate an event refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AggregateType {
    Channel,
    Template,
    Message,
}

/// An immutable record of something that happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    pub id: RequestId,
    pub event_type: EventType,
    pub aggregate_id: String,
    pub aggregate_type: AggregateType,
    /// Aggregate version after the change (template version, else 1).
    pub version: u32,
    pub payload: Value,
    pub timestamp: Timestamp,
}

impl DomainEvent {
    pub fn new(
        event_type: EventType,
        aggregate_type: AggregateType,
        aggregate_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: RequestId::new(),
            event_type,
            aggregate_id: aggregate_id.into(),
            aggregate_type,
            version: 1,
            payload,
            timestamp: now_millis(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}
