// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use courier_bus::{CommandHandler, CommandOutcome, QueryHandler};
use courier_core::traits::ChannelRepository;
use courier_core::{Channel, ChannelId, Context, CourierError, Page};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::info;

use super::to_data;
use crate::commands::{CreateChannelCommand, DeleteChannelCommand, UpdateChannelCommand};
use crate::events;
use crate::queries::{GetChannelQuery, ListChannelsQuery};
use crate::validator::ChannelValidator;

/// Handles channel writes and reads.
pub struct ChannelHandlers {
    channels: Arc<dyn ChannelRepository>,
    validator: ChannelValidator,
    writes: Arc<Mutex<()>>,
}

impl ChannelHandlers {
    /// `writes` is shared by every channel and template writer so that a
    /// check and the save that follows it see the same stored state.
    pub fn new(
        channels: Arc<dyn ChannelRepository>,
        validator: ChannelValidator,
        writes: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            channels,
            validator,
            writes,
        }
    }

    async fn load(&self, id: &ChannelId) -> Result<Channel, CourierError> {
        self.channels
            .find_by_id(id)
            .await?
            .ok_or_else(|| CourierError::not_found("channel", id.as_str()))
    }
}

#[async_trait]
impl CommandHandler<CreateChannelCommand> for ChannelHandlers {
    async fn handle(
        &self,
        _ctx: &Context,
        command: &CreateChannelCommand,
    ) -> Result<CommandOutcome, CourierError> {
        let _writes = self.writes.lock().await;
        let channel = command.to_channel();
        self.validator.validate_for_create(&channel).await?;
        self.channels.save(&channel).await?;
        info!(channel_id = %channel.id, channel_type = %channel.channel_type, "channel created");
        Ok(CommandOutcome::new()
            .with_data(to_data(&channel)?)
            .with_event(events::channel_created(&channel)))
    }
}

#[async_trait]
impl CommandHandler<UpdateChannelCommand> for ChannelHandlers {
    async fn handle(
        &self,
        _ctx: &Context,
        command: &UpdateChannelCommand,
    ) -> Result<CommandOutcome, CourierError> {
        let _writes = self.writes.lock().await;
        let existing = self.load(&command.channel_id).await?;
        let channel = self
            .validator
            .validate_for_update(&existing, &command.patch)
            .await?;
        self.channels.save(&channel).await?;
        info!(channel_id = %channel.id, "channel updated");
        Ok(CommandOutcome::new()
            .with_data(to_data(&channel)?)
            .with_event(events::channel_updated(&channel)))
    }
}

#[async_trait]
impl CommandHandler<DeleteChannelCommand> for ChannelHandlers {
    async fn handle(
        &self,
        _ctx: &Context,
        command: &DeleteChannelCommand,
    ) -> Result<CommandOutcome, CourierError> {
        let _writes = self.writes.lock().await;
        let existing = self.load(&command.channel_id).await?;
        self.validator.validate_for_delete(&existing).await?;
        self.channels.delete(&existing.id).await?;
        info!(channel_id = %existing.id, "channel deleted");
        Ok(CommandOutcome::new()
            .with_data(json!({ "id": existing.id }))
            .with_event(events::channel_deleted(&existing.id)))
    }
}

#[async_trait]
impl QueryHandler<GetChannelQuery> for ChannelHandlers {
    async fn handle(&self, _ctx: &Context, query: &GetChannelQuery) -> Result<Channel, CourierError> {
        self.load(&query.channel_id).await
    }
}

#[async_trait]
impl QueryHandler<ListChannelsQuery> for ChannelHandlers {
    async fn handle(
        &self,
        _ctx: &Context,
        query: &ListChannelsQuery,
    ) -> Result<Page<Channel>, CourierError> {
        self.channels.list(&query.query).await
    }
}
