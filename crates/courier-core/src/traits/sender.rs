// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender trait implemented by every channel type.

use async_trait::async_trait;

use crate::context::Context;
use crate::domain::{Channel, Recipient};
use crate::error::{CourierError, SenderError};
use crate::types::{RenderedContent, SendReceipt};

/// Delivers rendered content through one channel.
///
/// A sender is created by its channel type for a given timeout and may be
/// shared by many concurrent dispatches. Implementations should return
/// promptly once `ctx` is cancelled.
#[async_trait]
pub trait Sender: Send + Sync + 'static {
    /// Delivers `content` to `recipients` using the channel's configuration.
    async fn send(
        &self,
        ctx: &Context,
        channel: &Channel,
        content: &RenderedContent,
        recipients: &[Recipient],
    ) -> Result<SendReceipt, SenderError>;

    /// Releases pooled connections or other resources.
    async fn shutdown(&self) -> Result<(), CourierError> {
        Ok(())
    }
}
