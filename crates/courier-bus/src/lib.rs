// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process CQRS buses.
//!
//! The [`CommandBus`] and [`QueryBus`] route each message type to exactly one
//! handler; the [`EventBus`] broadcasts domain events to any number of
//! subscribers. All three are meant to be shared via `Arc` and keep their
//! routing tables behind readers-writer locks.

pub mod command;
pub mod event;
pub mod query;
pub mod result;

pub use command::{Command, CommandBus, CommandHandler, CommandOutcome};
pub use event::{EventBus, EventHandler, SubscriptionId};
pub use query::{Query, QueryBus, QueryHandler};
pub use result::{BusError, CommandResult, QueryResult};
