// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier notification service.
//!
//! This crate provides the domain model (channels, templates, messages),
//! the error taxonomy, the request [`Context`], list-query evaluation, and
//! the trait seams implemented by repositories, channel types and senders.

pub mod context;
pub mod domain;
pub mod error;
pub mod event;
pub mod ids;
pub mod query;
pub mod schema;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use context::Context;
pub use domain::{
    Channel, ChannelOverride, ChannelPatch, CommonSettings, Message, MessageResult,
    MessageSettings, MessageStatus, Recipient, RecipientType, ResultStatus, Template,
    TemplatePatch, TemplateVariable, Variables,
};
pub use error::{CourierError, DeliveryCode, ErrorCode, ErrorKind, SenderError};
pub use event::{AggregateType, DomainEvent, EventType};
pub use ids::{ChannelId, MessageId, RequestId, TemplateId, Timestamp, now_millis};
pub use query::{Filter, FilterOperator, ListQuery, Page, Pagination, Sort, SortOrder};
pub use types::{RenderedContent, SendReceipt, SendResult};

pub use traits::{
    ChannelRepository, ChannelType, MessageRepository, Sender, TemplateRepository,
};
