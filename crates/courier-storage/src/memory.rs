// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory repositories for tests and the `memory` storage backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use courier_core::query::apply_query;
use courier_core::traits::{ChannelRepository, MessageRepository, TemplateRepository};
use courier_core::{
    Channel, ChannelId, CourierError, ListQuery, Message, MessageId, Page, Template, TemplateId,
};

/// Rows sorted oldest first so unsorted lists are stable.
fn ordered<T>(rows: impl Iterator<Item = T>, key: impl Fn(&T) -> (i64, String)) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by_key(|r| key(r));
    rows
}

#[derive(Debug, Default)]
pub struct MemoryChannelRepository {
    rows: RwLock<HashMap<ChannelId, Channel>>,
}

impl MemoryChannelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, soft-deleted ones included.
    pub fn row_count(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl ChannelRepository for MemoryChannelRepository {
    async fn find_by_id(&self, id: &ChannelId) -> Result<Option<Channel>, CourierError> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.get(id).filter(|c| !c.is_deleted()).cloned())
    }

    async fn save(&self, channel: &Channel) -> Result<(), CourierError> {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel.id.clone(), channel.clone());
        Ok(())
    }

    async fn delete(&self, id: &ChannelId) -> Result<(), CourierError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.get_mut(id) {
            Some(channel) if !channel.is_deleted() => {
                channel.mark_deleted();
                Ok(())
            }
            _ => Err(CourierError::not_found("channel", id.as_str())),
        }
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Channel>, CourierError> {
        let live = {
            let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
            ordered(
                rows.values().filter(|c| !c.is_deleted()).cloned(),
                |c| (c.created_at, c.id.to_string()),
            )
        };
        Ok(apply_query(live, query))
    }
}

#[derive(Debug, Default)]
pub struct MemoryTemplateRepository {
    rows: RwLock<HashMap<TemplateId, Template>>,
}

impl MemoryTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl TemplateRepository for MemoryTemplateRepository {
    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, CourierError> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.get(id).filter(|t| !t.is_deleted()).cloned())
    }

    async fn save(&self, template: &Template) -> Result<(), CourierError> {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn delete(&self, id: &TemplateId) -> Result<(), CourierError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.get_mut(id) {
            Some(template) if !template.is_deleted() => {
                template.mark_deleted();
                Ok(())
            }
            _ => Err(CourierError::not_found("template", id.as_str())),
        }
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Template>, CourierError> {
        let live = {
            let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
            ordered(
                rows.values().filter(|t| !t.is_deleted()).cloned(),
                |t| (t.created_at, t.id.to_string()),
            )
        };
        Ok(apply_query(live, query))
    }
}

#[derive(Debug, Default)]
pub struct MemoryMessageRepository {
    rows: RwLock<HashMap<MessageId, Message>>,
    saves: AtomicUsize,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Total number of `save` calls, used to check write counts in tests.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn find_by_id(&self, id: &MessageId) -> Result<Option<Message>, CourierError> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.get(id).cloned())
    }

    async fn save(&self, message: &Message) -> Result<(), CourierError> {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(message.id.clone(), message.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Message>, CourierError> {
        let all = {
            let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
            ordered(rows.values().cloned(), |m| (m.created_at, m.id.to_string()))
        };
        Ok(apply_query(all, query))
    }
}
