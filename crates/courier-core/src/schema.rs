// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON Schema validation for channel configuration.

use serde_json::Value;

use crate::error::CourierError;

/// Validates `instance` against `schema`, collecting every violation.
pub fn validate_against_schema(schema: &Value, instance: &Value) -> Result<(), CourierError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| CourierError::Internal(format!("invalid config schema: {e}")))?;

    let violations: Vec<String> = validator
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(CourierError::validation("config", violations.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["host"],
            "properties": {
                "host": {"type": "string", "minLength": 1},
                "port": {"type": "integer", "minimum": 1, "maximum": 65535}
            }
        })
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_against_schema(&schema(), &json!({"host": "smtp", "port": 25})).is_ok());
    }

    #[test]
    fn all_violations_are_reported() {
        let err = validate_against_schema(&schema(), &json!({"port": 0})).unwrap_err();
        match err {
            CourierError::Validation { field, reason } => {
                assert_eq!(field, "config");
                assert!(reason.contains("host"), "{reason}");
                assert!(reason.contains(';'), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
