// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel SMTP settings.

use courier_core::SenderError;
use lettre::message::Mailbox;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Default SMTP submission port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    Starttls,
    /// Implicit TLS, usually on port 465.
    Tls,
    /// Plain text. Only for local relays and tests.
    #[serde(rename = "none")]
    Plain,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct EmailChannelConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    #[serde(default)]
    pub tls: TlsMode,
}

fn default_port() -> u16 {
    DEFAULT_SMTP_PORT
}

impl std::fmt::Debug for EmailChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailChannelConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .field("tls", &self.tls)
            .finish()
    }
}

impl EmailChannelConfig {
    /// Reads the settings out of a channel's `config` object.
    pub fn from_map(config: &Map<String, Value>) -> Result<Self, SenderError> {
        serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| SenderError::internal(format!("invalid email config: {e}")))
    }

    pub fn mailbox(&self) -> Result<Mailbox, SenderError> {
        self.from
            .parse()
            .map_err(|e| SenderError::internal(format!("invalid from address `{}`: {e}", self.from)))
    }

    pub(crate) fn transport_key(&self) -> TransportKey {
        TransportKey {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            tls: self.tls,
        }
    }
}

/// Identifies a pooled SMTP transport.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct TransportKey {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: TlsMode,
}
