// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result envelopes returned by the command and query buses.

use std::time::Duration;

use courier_core::{CourierError, DomainEvent, ErrorCode, ErrorKind, RequestId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Transport-safe view of a [`CourierError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusError {
    pub code: ErrorCode,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&CourierError> for BusError {
    fn from(err: &CourierError) -> Self {
        Self {
            code: err.code(),
            kind: err.kind(),
            message: err.public_message(),
            details: err.details(),
        }
    }
}

/// Outcome of [`CommandBus::execute`](crate::CommandBus::execute).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Id of the command that produced this result.
    pub id: RequestId,
    pub command_type: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BusError>,
    #[serde(default)]
    pub events: Vec<DomainEvent>,
    pub executed_at: Timestamp,
    pub duration_ms: u64,
}

impl CommandResult {
    pub(crate) fn succeeded(
        id: RequestId,
        command_type: &str,
        data: Option<Value>,
        events: Vec<DomainEvent>,
        executed_at: Timestamp,
        duration: Duration,
    ) -> Self {
        Self {
            id,
            command_type: command_type.to_string(),
            success: true,
            data,
            error: None,
            events,
            executed_at,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub(crate) fn failed(
        id: RequestId,
        command_type: &str,
        err: &CourierError,
        executed_at: Timestamp,
        duration: Duration,
    ) -> Self {
        Self {
            id,
            command_type: command_type.to_string(),
            success: false,
            data: None,
            error: Some(BusError::from(err)),
            events: Vec::new(),
            executed_at,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Error kind of a failed result.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Outcome of [`QueryBus::execute`](crate::QueryBus::execute).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub id: RequestId,
    pub query_type: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BusError>,
    pub executed_at: Timestamp,
    pub duration_ms: u64,
    /// Always false until a read cache exists.
    pub cache_hit: bool,
}

impl QueryResult {
    pub(crate) fn succeeded(
        id: RequestId,
        query_type: &str,
        data: Value,
        executed_at: Timestamp,
        duration: Duration,
    ) -> Self {
        Self {
            id,
            query_type: query_type.to_string(),
            success: true,
            data: Some(data),
            error: None,
            executed_at,
            duration_ms: duration.as_millis() as u64,
            cache_hit: false,
        }
    }

    pub(crate) fn failed(
        id: RequestId,
        query_type: &str,
        err: &CourierError,
        executed_at: Timestamp,
        duration: Duration,
    ) -> Self {
        Self {
            id,
            query_type: query_type.to_string(),
            success: false,
            data: None,
            error: Some(BusError::from(err)),
            executed_at,
            duration_ms: duration.as_millis() as u64,
            cache_hit: false,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
