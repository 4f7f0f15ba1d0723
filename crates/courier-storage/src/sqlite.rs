// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementations of the repository traits.
//!
//! Each repository shares one [`Database`] handle and delegates to the typed
//! query modules. List queries load the live rows and evaluate filters in
//! process so that filter semantics match the in-memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::query::apply_query;
use courier_core::traits::{ChannelRepository, MessageRepository, TemplateRepository};
use courier_core::{
    Channel, ChannelId, CourierError, ListQuery, Message, MessageId, Page, Template, TemplateId,
};

use crate::database::Database;
use crate::queries;

#[derive(Debug, Clone)]
pub struct SqliteChannelRepository {
    db: Arc<Database>,
}

impl SqliteChannelRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChannelRepository for SqliteChannelRepository {
    async fn find_by_id(&self, id: &ChannelId) -> Result<Option<Channel>, CourierError> {
        queries::channels::get_channel(&self.db, id).await
    }

    async fn save(&self, channel: &Channel) -> Result<(), CourierError> {
        queries::channels::upsert_channel(&self.db, channel).await
    }

    async fn delete(&self, id: &ChannelId) -> Result<(), CourierError> {
        if queries::channels::soft_delete_channel(&self.db, id).await? {
            Ok(())
        } else {
            Err(CourierError::not_found("channel", id.as_str()))
        }
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Channel>, CourierError> {
        let rows = queries::channels::list_live_channels(&self.db).await?;
        Ok(apply_query(rows, query))
    }
}

#[derive(Debug, Clone)]
pub struct SqliteTemplateRepository {
    db: Arc<Database>,
}

impl SqliteTemplateRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TemplateRepository for SqliteTemplateRepository {
    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, CourierError> {
        queries::templates::get_template(&self.db, id).await
    }

    async fn save(&self, template: &Template) -> Result<(), CourierError> {
        queries::templates::upsert_template(&self.db, template).await
    }

    async fn delete(&self, id: &TemplateId) -> Result<(), CourierError> {
        if queries::templates::soft_delete_template(&self.db, id).await? {
            Ok(())
        } else {
            Err(CourierError::not_found("template", id.as_str()))
        }
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Template>, CourierError> {
        let rows = queries::templates::list_live_templates(&self.db).await?;
        Ok(apply_query(rows, query))
    }
}

#[derive(Debug, Clone)]
pub struct SqliteMessageRepository {
    db: Arc<Database>,
}

impl SqliteMessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageRepository for SqliteMessageRepository {
    async fn find_by_id(&self, id: &MessageId) -> Result<Option<Message>, CourierError> {
        queries::messages::get_message(&self.db, id).await
    }

    async fn save(&self, message: &Message) -> Result<(), CourierError> {
        queries::messages::save_message(&self.db, message).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Message>, CourierError> {
        let rows = queries::messages::list_messages(&self.db).await?;
        Ok(apply_query(rows, query))
    }
}
