// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Later layers win: compiled defaults, `/etc/courier/courier.toml`,
//! `~/.config/courier/courier.toml`, `./courier.toml`, then `COURIER_*`
//! environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CourierConfig;

/// Config sections addressable from the environment, longest first so that
/// `channel_types_` is not mistaken for a shorter prefix.
const ENV_SECTIONS: &[&str] = &["channel_types", "dispatch", "gateway", "service", "storage"];

/// TOML files searched by [`load_config`], lowest precedence first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/courier/courier.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("courier").join("courier.toml"));
    }
    paths.push(PathBuf::from("courier.toml"));
    paths
}

/// Figment with every layer merged, before extraction.
pub fn build_figment() -> Figment {
    config_paths()
        .into_iter()
        .fold(defaults(), |figment, path| figment.merge(Toml::file(path)))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env overrides.
pub fn load_config() -> Result<CourierConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<CourierConfig, figment::Error> {
    defaults().merge(Toml::string(toml_content)).extract()
}

/// Load configuration from an explicit file, still honoring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<CourierConfig, figment::Error> {
    defaults()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

fn defaults() -> Figment {
    Figment::new().merge(Serialized::defaults(CourierConfig::default()))
}

/// Maps `COURIER_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Keys keep their underscores: `COURIER_STORAGE_DATABASE_PATH` becomes
/// `storage.database_path`, never `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("COURIER_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
