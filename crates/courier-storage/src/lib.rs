// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for channels, templates and messages.
//!
//! Two backends implement the repository traits from `courier-core`: an
//! in-memory set used by tests and the `memory` backend, and a SQLite set
//! running on a single `tokio-rusqlite` connection with embedded refinery
//! migrations.

pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;
pub mod repositories;
pub mod sqlite;

pub use database::Database;
pub use memory::{MemoryChannelRepository, MemoryMessageRepository, MemoryTemplateRepository};
pub use repositories::Repositories;
pub use sqlite::{SqliteChannelRepository, SqliteMessageRepository, SqliteTemplateRepository};
