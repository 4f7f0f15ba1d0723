// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/reply envelopes for the broker adapter.

use courier_bus::{BusError, CommandResult, QueryResult};
use courier_core::{CourierError, ErrorCode, Timestamp, now_millis};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub req_seq_id: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default = "now_millis")]
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<BusError> for EnvelopeError {
    fn from(err: BusError) -> Self {
        Self {
            code: err.code,
            message: err.message,
            details: err.details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub req_seq_id: String,
    pub rsp_seq_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
    pub timestamp: Timestamp,
}

impl ResponseEnvelope {
    fn new(req_seq_id: &str, data: Option<Value>, error: Option<EnvelopeError>) -> Self {
        Self {
            req_seq_id: req_seq_id.to_string(),
            rsp_seq_id: uuid::Uuid::new_v4().to_string(),
            success: error.is_none(),
            data,
            error,
            timestamp: now_millis(),
        }
    }

    pub fn from_command(req_seq_id: &str, result: CommandResult) -> Self {
        Self::new(req_seq_id, result.data, result.error.map(EnvelopeError::from))
    }

    pub fn from_query(req_seq_id: &str, result: QueryResult) -> Self {
        Self::new(req_seq_id, result.data, result.error.map(EnvelopeError::from))
    }

    /// A failure raised before the request reached a bus.
    pub fn from_error(req_seq_id: &str, err: &CourierError) -> Self {
        Self::new(req_seq_id, None, Some(BusError::from(err).into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_camel_case() {
        let req: RequestEnvelope =
            serde_json::from_value(json!({"reqSeqId": "r1", "data": {"a": 1}, "timestamp": 5}))
                .unwrap();
        assert_eq!(req.req_seq_id, "r1");
        assert_eq!(req.timestamp, 5);
    }

    #[test]
    fn error_response_carries_wire_code() {
        let rsp = ResponseEnvelope::from_error("r1", &CourierError::not_found("channel", "c9"));
        let value = serde_json::to_value(&rsp).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"]["code"], json!("NOT_FOUND"));
        assert_eq!(value["reqSeqId"], json!("r1"));
        assert!(value.get("data").is_none());
        assert_ne!(rsp.rsp_seq_id, rsp.req_seq_id);
    }
}
