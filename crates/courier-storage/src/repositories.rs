// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The repository set selected by configuration.

use std::sync::Arc;

use courier_config::{StorageBackend, StorageConfig};
use courier_core::CourierError;
use courier_core::traits::{ChannelRepository, MessageRepository, TemplateRepository};
use tracing::info;

use crate::database::Database;
use crate::memory::{MemoryChannelRepository, MemoryMessageRepository, MemoryTemplateRepository};
use crate::sqlite::{SqliteChannelRepository, SqliteMessageRepository, SqliteTemplateRepository};

/// One repository per aggregate, sharing a backend.
#[derive(Clone)]
pub struct Repositories {
    pub channels: Arc<dyn ChannelRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub messages: Arc<dyn MessageRepository>,
    db: Option<Arc<Database>>,
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories")
            .field("backend", &self.backend())
            .finish()
    }
}

impl Repositories {
    /// Open the backend named in `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, CourierError> {
        match config.backend {
            StorageBackend::Memory => Ok(Self::in_memory()),
            StorageBackend::Sqlite => {
                let db = Database::open(&config.database_path, config.wal_mode).await?;
                Ok(Self::sqlite(Arc::new(db)))
            }
        }
    }

    pub fn in_memory() -> Self {
        info!("using in-memory repositories");
        Self {
            channels: Arc::new(MemoryChannelRepository::new()),
            templates: Arc::new(MemoryTemplateRepository::new()),
            messages: Arc::new(MemoryMessageRepository::new()),
            db: None,
        }
    }

    pub fn sqlite(db: Arc<Database>) -> Self {
        info!(path = db.path(), "using sqlite repositories");
        Self {
            channels: Arc::new(SqliteChannelRepository::new(db.clone())),
            templates: Arc::new(SqliteTemplateRepository::new(db.clone())),
            messages: Arc::new(SqliteMessageRepository::new(db.clone())),
            db: Some(db),
        }
    }

    pub fn backend(&self) -> StorageBackend {
        if self.db.is_some() {
            StorageBackend::Sqlite
        } else {
            StorageBackend::Memory
        }
    }

    /// Checkpoint and close the database, if any.
    pub async fn close(&self) -> Result<(), CourierError> {
        match &self.db {
            Some(db) => db.close().await,
            None => Ok(()),
        }
    }
}
