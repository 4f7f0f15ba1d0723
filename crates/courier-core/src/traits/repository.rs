// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository contracts for the three aggregates.
//!
//! Soft-deleted channels and templates are invisible to `find_by_id` and
//! `list`. `find_by_id` returns `Ok(None)` for a miss; callers decide whether
//! that is a `NotFound` error.

use async_trait::async_trait;

use crate::domain::{Channel, Message, Template};
use crate::error::CourierError;
use crate::ids::{ChannelId, MessageId, TemplateId};
use crate::query::{ListQuery, Page};

#[async_trait]
pub trait ChannelRepository: Send + Sync + 'static {
    async fn find_by_id(&self, id: &ChannelId) -> Result<Option<Channel>, CourierError>;

    /// Inserts or replaces the channel.
    async fn save(&self, channel: &Channel) -> Result<(), CourierError>;

    /// Soft-deletes the channel. Deleting a missing channel is `NotFound`.
    async fn delete(&self, id: &ChannelId) -> Result<(), CourierError>;

    async fn list(&self, query: &ListQuery) -> Result<Page<Channel>, CourierError>;
}

#[async_trait]
pub trait TemplateRepository: Send + Sync + 'static {
    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, CourierError>;

    async fn save(&self, template: &Template) -> Result<(), CourierError>;

    async fn delete(&self, id: &TemplateId) -> Result<(), CourierError>;

    async fn list(&self, query: &ListQuery) -> Result<Page<Template>, CourierError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync + 'static {
    async fn find_by_id(&self, id: &MessageId) -> Result<Option<Message>, CourierError>;

    /// Upserts the message together with its results.
    async fn save(&self, message: &Message) -> Result<(), CourierError>;

    async fn list(&self, query: &ListQuery) -> Result<Page<Message>, CourierError>;
}
