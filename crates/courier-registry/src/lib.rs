// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel-type registry and catalog.
//!
//! Channel types (email, sms, slack, ...) are compiled in and registered at
//! startup. The registry hands out cached senders per timeout and releases
//! them on shutdown; the catalog describes what is registered.

pub mod catalog;
pub mod registry;

pub use catalog::{ChannelTypeInfo, catalog, search_catalog};
pub use registry::{
    ChannelTypeEntry, ChannelTypeRegistry, SENDER_TIMEOUT_BUCKETS, timeout_bucket,
};
