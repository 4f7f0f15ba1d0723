// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email channel type for Courier.
//!
//! Delivers one SMTP message per send, addressed to every `to`, `cc` and
//! `bcc` recipient at once. SMTP transports are pooled per server and
//! credential set and released on shutdown.

pub mod config;
pub mod sender;

use std::sync::Arc;
use std::time::Duration;

use courier_core::schema::validate_against_schema;
use courier_core::traits::{ChannelType, Sender};
use courier_core::{CourierError, RecipientType};
use serde_json::{Map, Value, json};

pub use config::{EmailChannelConfig, TlsMode};
pub use sender::EmailSender;

/// The `email` channel type.
#[derive(Debug, Default)]
pub struct EmailChannelType;

impl EmailChannelType {
    pub fn new() -> Self {
        Self
    }
}

impl ChannelType for EmailChannelType {
    fn name(&self) -> &str {
        "email"
    }

    fn display_name(&self) -> &str {
        "Email"
    }

    fn description(&self) -> &str {
        "Sends email through an SMTP relay"
    }

    fn config_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["host", "from"],
            "additionalProperties": false,
            "properties": {
                "host": {"type": "string", "minLength": 1},
                "port": {"type": "integer", "minimum": 1, "maximum": 65535},
                "username": {"type": "string"},
                "password": {"type": "string"},
                "from": {"type": "string", "minLength": 1},
                "tls": {"enum": ["starttls", "tls", "none"]}
            }
        })
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), CourierError> {
        validate_against_schema(&self.config_schema(), &Value::Object(config.clone()))?;
        let parsed = EmailChannelConfig::from_map(config)
            .map_err(|e| CourierError::validation("config", e.details))?;
        parsed
            .mailbox()
            .map(|_| ())
            .map_err(|e| CourierError::validation("config.from", e.details))
    }

    fn create_sender(&self, timeout: Duration) -> Result<Arc<dyn Sender>, CourierError> {
        Ok(Arc::new(EmailSender::new(timeout)))
    }

    fn recipient_types(&self) -> Vec<RecipientType> {
        vec![RecipientType::To, RecipientType::Cc, RecipientType::Bcc]
    }
}
