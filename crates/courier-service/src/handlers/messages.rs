// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use courier_bus::{CommandHandler, CommandOutcome, QueryHandler};
use courier_core::traits::MessageRepository;
use courier_core::{Context, CourierError, Message, Page};

use super::to_data;
use crate::commands::SendMessageCommand;
use crate::dispatcher::MessageDispatcher;
use crate::events;
use crate::queries::{GetMessageQuery, ListMessagesQuery};

/// Runs sends through the dispatcher and serves message reads.
pub struct MessageHandlers {
    messages: Arc<dyn MessageRepository>,
    dispatcher: Arc<MessageDispatcher>,
}

impl MessageHandlers {
    pub fn new(messages: Arc<dyn MessageRepository>, dispatcher: Arc<MessageDispatcher>) -> Self {
        Self {
            messages,
            dispatcher,
        }
    }
}

#[async_trait]
impl CommandHandler<SendMessageCommand> for MessageHandlers {
    /// Succeeds whenever the message was dispatched, even if every channel
    /// failed; per-channel outcomes are in the returned message.
    async fn handle(
        &self,
        ctx: &Context,
        command: &SendMessageCommand,
    ) -> Result<CommandOutcome, CourierError> {
        let message = self.dispatcher.dispatch(ctx, command.to_message()?).await?;
        Ok(CommandOutcome::new()
            .with_data(to_data(&message)?)
            .with_event(events::message_outcome(&message)))
    }
}

#[async_trait]
impl QueryHandler<GetMessageQuery> for MessageHandlers {
    async fn handle(&self, _ctx: &Context, query: &GetMessageQuery) -> Result<Message, CourierError> {
        self.messages
            .find_by_id(&query.message_id)
            .await?
            .ok_or_else(|| CourierError::not_found("message", query.message_id.as_str()))
    }
}

#[async_trait]
impl QueryHandler<ListMessagesQuery> for MessageHandlers {
    async fn handle(
        &self,
        _ctx: &Context,
        query: &ListMessagesQuery,
    ) -> Result<Page<Message>, CourierError> {
        self.messages.list(&query.query).await
    }
}
