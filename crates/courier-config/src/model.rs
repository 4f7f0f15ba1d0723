// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model for the Courier service.
//!
//! Every struct rejects unknown keys so typos surface at startup with a
//! suggestion instead of being silently ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Courier configuration.
///
/// All sections are optional and fall back to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Repository backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Send pipeline limits.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Built-in channel types keyed by name. Missing entries are enabled.
    #[serde(default)]
    pub channel_types: BTreeMap<String, bool>,
}

impl CourierConfig {
    /// Whether the built-in channel type `name` should be registered.
    pub fn channel_type_enabled(&self, name: &str) -> bool {
        self.channel_types.get(name).copied().unwrap_or(true)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name reported by the health route and in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "courier".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which repository implementation backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file. Ignored by the memory backend.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journaling for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier").join("courier.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("courier.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

/// Limits applied by the message dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Maximum number of channels dispatched concurrently for one message.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Upper bound on per-channel retry attempts, whatever the channel asks for.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Grace period for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_retry_attempts: default_max_retry_attempts(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_max_concurrency() -> usize {
    16
}

fn default_max_retry_attempts() -> u32 {
    5
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_types_default_to_enabled() {
        let mut config = CourierConfig::default();
        assert!(config.channel_type_enabled("sms"));
        config.channel_types.insert("sms".into(), false);
        assert!(!config.channel_type_enabled("sms"));
        assert!(config.channel_type_enabled("email"));
    }

    #[test]
    fn storage_backend_parses_lowercase() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!(StorageBackend::Sqlite.to_string(), "sqlite");
    }
}
