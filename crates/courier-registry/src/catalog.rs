// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel-type catalog.
//!
//! Describes the registered channel types for the `channel-types` CLI
//! subcommand and the `GET /v1/channel-types` route.

use serde::Serialize;
use serde_json::Value;

use crate::registry::ChannelTypeRegistry;

/// Public description of a registered channel type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTypeInfo {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub recipient_types: Vec<String>,
    pub config_schema: Value,
}

/// Returns info for every registered channel type, sorted by name.
pub fn catalog(registry: &ChannelTypeRegistry) -> Vec<ChannelTypeInfo> {
    registry
        .list_all()
        .iter()
        .map(|entry| {
            let ct = entry.channel_type();
            ChannelTypeInfo {
                name: ct.name().to_string(),
                display_name: ct.display_name().to_string(),
                description: ct.description().to_string(),
                recipient_types: ct.recipient_types().iter().map(ToString::to_string).collect(),
                config_schema: ct.config_schema(),
            }
        })
        .collect()
}

/// Search the catalog by query string.
///
/// Filters entries whose name or description contains the query (case-insensitive).
/// If query is empty, returns all entries.
pub fn search_catalog(registry: &ChannelTypeRegistry, query: &str) -> Vec<ChannelTypeInfo> {
    let all = catalog(registry);
    if query.is_empty() {
        return all;
    }
    let query_lower = query.to_lowercase();
    all.into_iter()
        .filter(|info| {
            info.name.to_lowercase().contains(&query_lower)
                || info.display_name.to_lowercase().contains(&query_lower)
                || info.description.to_lowercase().contains(&query_lower)
        })
        .collect()
}
