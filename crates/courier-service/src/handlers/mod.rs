// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command and query handlers, grouped by aggregate.

mod channels;
mod messages;
mod templates;

pub use channels::ChannelHandlers;
pub use messages::MessageHandlers;
pub use templates::TemplateHandlers;

use courier_core::CourierError;
use serde::Serialize;
use serde_json::Value;

/// Serializes a handler's result payload.
fn to_data<T: Serialize>(value: &T) -> Result<Value, CourierError> {
    serde_json::to_value(value)
        .map_err(|e| CourierError::Internal(format!("serialize handler output: {e}")))
}
