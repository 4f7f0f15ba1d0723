// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel type definition trait.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::domain::RecipientType;
use crate::error::CourierError;
use crate::schema::validate_against_schema;
use crate::traits::sender::Sender;

/// A family of channels (email, sms, ...) registered at startup.
pub trait ChannelType: Send + Sync + 'static {
    /// Registry key, e.g. `"email"`.
    fn name(&self) -> &str;

    fn display_name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema every channel config of this type must satisfy.
    fn config_schema(&self) -> Value;

    /// Validates a channel's config. Defaults to schema validation.
    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), CourierError> {
        validate_against_schema(&self.config_schema(), &Value::Object(config.clone()))
    }

    /// Builds a sender whose network calls respect `timeout`.
    fn create_sender(&self, timeout: Duration) -> Result<Arc<dyn Sender>, CourierError>;

    /// Recipient kinds this type delivers to; others are dropped before sending.
    fn recipient_types(&self) -> Vec<RecipientType> {
        vec![RecipientType::To]
    }
}
