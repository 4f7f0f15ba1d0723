// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams of the notification service.
//!
//! Repositories persist aggregates, channel types describe and validate a
//! family of channels, and senders perform the actual delivery. Async traits
//! use `#[async_trait]` so they can be held as trait objects.

pub mod channel_type;
pub mod repository;
pub mod sender;

pub use channel_type::ChannelType;
pub use repository::{ChannelRepository, MessageRepository, TemplateRepository};
pub use sender::Sender;
