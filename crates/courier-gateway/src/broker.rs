// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subject-based request/reply routing.
//!
//! A broker transport hands each request to [`BrokerRouter::handle`] with
//! its subject (`channel.create`, `message.send`, ...) and publishes the
//! returned envelope on the reply subject. The router decodes `data` into
//! the matching command or query and runs it through the service.

use std::sync::Arc;

use courier_bus::{Command, Query};
use courier_core::{Context, CourierError};
use courier_service::{
    CreateChannelCommand, CreateTemplateCommand, DeleteChannelCommand, DeleteTemplateCommand,
    GetChannelQuery, GetMessageQuery, GetTemplateQuery, ListChannelsQuery, ListMessagesQuery,
    ListTemplatesQuery, NotificationService, SendMessageCommand, UpdateChannelCommand,
    UpdateTemplateCommand,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::{RequestEnvelope, ResponseEnvelope};

/// Every subject the router answers.
pub const SUBJECTS: &[&str] = &[
    CreateChannelCommand::COMMAND_TYPE,
    UpdateChannelCommand::COMMAND_TYPE,
    DeleteChannelCommand::COMMAND_TYPE,
    GetChannelQuery::QUERY_TYPE,
    ListChannelsQuery::QUERY_TYPE,
    CreateTemplateCommand::COMMAND_TYPE,
    UpdateTemplateCommand::COMMAND_TYPE,
    DeleteTemplateCommand::COMMAND_TYPE,
    GetTemplateQuery::QUERY_TYPE,
    ListTemplatesQuery::QUERY_TYPE,
    SendMessageCommand::COMMAND_TYPE,
    GetMessageQuery::QUERY_TYPE,
    ListMessagesQuery::QUERY_TYPE,
];

#[derive(Debug, Clone)]
pub struct BrokerRouter {
    service: Arc<NotificationService>,
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, CourierError> {
    serde_json::from_value(data).map_err(|e| CourierError::validation("data", e.to_string()))
}

impl BrokerRouter {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }

    /// Decodes raw bytes, routes them and encodes the reply.
    pub async fn handle_bytes(&self, ctx: &Context, subject: &str, payload: &[u8]) -> Vec<u8> {
        let response = match serde_json::from_slice::<RequestEnvelope>(payload) {
            Ok(request) => self.handle(ctx, subject, request).await,
            Err(e) => {
                warn!(subject, error = %e, "malformed broker request");
                let err = CourierError::validation("envelope", e.to_string());
                ResponseEnvelope::from_error("", &err)
            }
        };
        serde_json::to_vec(&response).unwrap_or_default()
    }

    pub async fn handle(
        &self,
        ctx: &Context,
        subject: &str,
        request: RequestEnvelope,
    ) -> ResponseEnvelope {
        debug!(subject, req_seq_id = %request.req_seq_id, "broker request");
        let RequestEnvelope { req_seq_id, data, .. } = request;
        let id = req_seq_id.as_str();
        match subject {
            CreateChannelCommand::COMMAND_TYPE => self.command::<CreateChannelCommand>(ctx, id, data).await,
            UpdateChannelCommand::COMMAND_TYPE => self.command::<UpdateChannelCommand>(ctx, id, data).await,
            DeleteChannelCommand::COMMAND_TYPE => self.command::<DeleteChannelCommand>(ctx, id, data).await,
            GetChannelQuery::QUERY_TYPE => self.query::<GetChannelQuery>(ctx, id, data).await,
            ListChannelsQuery::QUERY_TYPE => self.query::<ListChannelsQuery>(ctx, id, data).await,
            CreateTemplateCommand::COMMAND_TYPE => {
                self.command::<CreateTemplateCommand>(ctx, id, data).await
            }
            UpdateTemplateCommand::COMMAND_TYPE => {
                self.command::<UpdateTemplateCommand>(ctx, id, data).await
            }
            DeleteTemplateCommand::COMMAND_TYPE => {
                self.command::<DeleteTemplateCommand>(ctx, id, data).await
            }
            GetTemplateQuery::QUERY_TYPE => self.query::<GetTemplateQuery>(ctx, id, data).await,
            ListTemplatesQuery::QUERY_TYPE => self.query::<ListTemplatesQuery>(ctx, id, data).await,
            SendMessageCommand::COMMAND_TYPE => self.command::<SendMessageCommand>(ctx, id, data).await,
            GetMessageQuery::QUERY_TYPE => self.query::<GetMessageQuery>(ctx, id, data).await,
            ListMessagesQuery::QUERY_TYPE => self.query::<ListMessagesQuery>(ctx, id, data).await,
            other => ResponseEnvelope::from_error(
                id,
                &CourierError::validation("subject", format!("unknown subject `{other}`")),
            ),
        }
    }

    async fn command<C>(&self, ctx: &Context, id: &str, data: Value) -> ResponseEnvelope
    where
        C: Command + DeserializeOwned,
    {
        match decode::<C>(data) {
            Ok(command) => ResponseEnvelope::from_command(id, self.service.execute(ctx, &command).await),
            Err(e) => ResponseEnvelope::from_error(id, &e),
        }
    }

    async fn query<Q>(&self, ctx: &Context, id: &str, data: Value) -> ResponseEnvelope
    where
        Q: Query + DeserializeOwned,
    {
        match decode::<Q>(data) {
            Ok(query) => ResponseEnvelope::from_query(id, self.service.query(ctx, &query).await),
            Err(e) => ResponseEnvelope::from_error(id, &e),
        }
    }
}
