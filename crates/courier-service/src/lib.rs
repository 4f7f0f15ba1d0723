// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Courier service layer.
//!
//! Commands and queries for channels, templates and messages, the handlers
//! that serve them, the template renderer and the send pipeline. Adapters
//! talk to [`NotificationService`] only.

pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod handlers;
pub mod queries;
pub mod render;
pub mod service;
pub mod validator;

#[cfg(test)]
mod testing;

pub use commands::{
    CreateChannelCommand, CreateTemplateCommand, DeleteChannelCommand, DeleteTemplateCommand,
    SendMessageCommand, UpdateChannelCommand, UpdateTemplateCommand,
};
pub use dispatcher::MessageDispatcher;
pub use queries::{
    GetChannelQuery, GetMessageQuery, GetTemplateQuery, ListChannelsQuery, ListMessagesQuery,
    ListTemplatesQuery,
};
pub use render::{render, render_template};
pub use service::{NotificationService, NotificationServiceBuilder};
