// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain entities and value objects.

pub mod channel;
pub mod message;
pub mod recipient;
pub mod template;

pub use channel::{Channel, ChannelPatch, CommonSettings};
pub use message::{
    ChannelOverride, Message, MessageResult, MessageSettings, MessageStatus, ResultStatus,
    Variables, aggregate_status, dedupe_channel_ids,
};
pub use recipient::{Recipient, RecipientType, merge_recipients};
pub use template::{Template, TemplatePatch, TemplateVariable};
