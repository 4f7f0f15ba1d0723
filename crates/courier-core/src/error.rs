// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier notification service.
//!
//! [`CourierError`] is the single error enum crossing crate boundaries. Each
//! variant maps to a coarse [`ErrorKind`] (used by tests and logs) and to a
//! wire-level [`ErrorCode`] (used by transport adapters). Per-channel delivery
//! failures are carried separately as [`SenderError`] with a [`DeliveryCode`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Failure code recorded on a per-channel delivery result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryCode {
    /// The per-channel timeout budget was exhausted.
    Timeout,
    /// Network or upstream server failure.
    Transport,
    /// Credentials were rejected by the provider.
    Auth,
    /// The provider throttled the request.
    RateLimited,
    /// The provider rejected a recipient.
    InvalidRecipient,
    /// Unclassified provider failure.
    Unknown,
    /// The sender panicked or an unexpected error occurred.
    Internal,
    /// The caller's context was cancelled before the dispatch settled.
    Canceled,
    /// No recipients were left after merging and deduplication.
    NoRecipients,
    /// The channel is disabled and was not dispatched.
    ChannelDisabled,
}

impl DeliveryCode {
    /// Whether failures with this code are worth retrying by default.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            DeliveryCode::Timeout | DeliveryCode::Transport | DeliveryCode::RateLimited
        )
    }
}

/// Error returned by a channel [`Sender`](crate::traits::Sender).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {details}")]
pub struct SenderError {
    /// Classification of the failure.
    pub code: DeliveryCode,
    /// Whether the dispatcher may retry the call.
    pub retryable: bool,
    /// Human-readable detail from the provider.
    pub details: String,
}

impl SenderError {
    /// Creates an error whose retryability follows [`DeliveryCode::is_transient`].
    pub fn new(code: DeliveryCode, details: impl Into<String>) -> Self {
        Self {
            code,
            retryable: code.is_transient(),
            details: details.into(),
        }
    }

    pub fn timeout(details: impl Into<String>) -> Self {
        Self::new(DeliveryCode::Timeout, details)
    }

    pub fn transport(details: impl Into<String>) -> Self {
        Self::new(DeliveryCode::Transport, details)
    }

    pub fn auth(details: impl Into<String>) -> Self {
        Self::new(DeliveryCode::Auth, details)
    }

    pub fn rate_limited(details: impl Into<String>) -> Self {
        Self::new(DeliveryCode::RateLimited, details)
    }

    pub fn invalid_recipient(details: impl Into<String>) -> Self {
        Self::new(DeliveryCode::InvalidRecipient, details)
    }

    pub fn unknown(details: impl Into<String>) -> Self {
        Self::new(DeliveryCode::Unknown, details)
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(DeliveryCode::Internal, details)
    }

    pub fn canceled() -> Self {
        Self::new(DeliveryCode::Canceled, "context canceled")
    }

    /// Classifies a non-success HTTP status from a provider API.
    ///
    /// 401/403 are auth failures, 429 is throttling, 5xx are transport
    /// failures and any other status is treated as a rejected recipient.
    pub fn from_http_status(status: u16, details: impl Into<String>) -> Self {
        let code = match status {
            401 | 403 => DeliveryCode::Auth,
            429 => DeliveryCode::RateLimited,
            500..=599 => DeliveryCode::Transport,
            400..=499 => DeliveryCode::InvalidRecipient,
            _ => DeliveryCode::Unknown,
        };
        Self::new(code, details)
    }

    /// Overrides the default retryability.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// Wire-level error code surfaced by transport adapters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    ExecutionError,
    NotFound,
    Conflict,
    InternalError,
}

/// Coarse classification of a [`CourierError`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    MissingVariable,
    NotFound,
    Conflict,
    TypeMismatch,
    Sender,
    Canceled,
    HandlerNotFound,
    AlreadyRegistered,
    Config,
    Storage,
    Internal,
}

/// The primary error type used across all Courier crates.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Input rejected before any side effect.
    #[error("validation failed for `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// A template variable declared as required was not supplied.
    #[error("missing required variable `{name}`")]
    MissingVariable { name: String },

    /// A referenced entity does not exist (or is soft-deleted).
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Uniqueness or referential-integrity breach.
    #[error("{kind} conflict: {reason}")]
    Conflict { kind: String, reason: String },

    /// Channel and template disagree on the channel type.
    #[error("channel type mismatch: expected `{expected}`, got `{actual}`")]
    TypeMismatch { expected: String, actual: String },

    /// A channel sender failed.
    #[error("sender error: {0}")]
    Sender(#[from] SenderError),

    /// The context was cancelled or its deadline passed.
    #[error("operation canceled")]
    Canceled,

    /// No handler is registered for a command or query type.
    #[error("no handler registered for `{message_type}`")]
    HandlerNotFound { message_type: String },

    /// A name was registered twice (bus handler, channel type).
    #[error("{kind} `{name}` is already registered")]
    AlreadyRegistered { kind: String, name: String },

    /// Configuration errors (invalid values, missing keys).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CourierError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        CourierError::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn conflict(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        CourierError::Conflict {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        CourierError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CourierError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns the coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CourierError::Validation { .. } => ErrorKind::Validation,
            CourierError::MissingVariable { .. } => ErrorKind::MissingVariable,
            CourierError::NotFound { .. } => ErrorKind::NotFound,
            CourierError::Conflict { .. } => ErrorKind::Conflict,
            CourierError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            CourierError::Sender(_) => ErrorKind::Sender,
            CourierError::Canceled => ErrorKind::Canceled,
            CourierError::HandlerNotFound { .. } => ErrorKind::HandlerNotFound,
            CourierError::AlreadyRegistered { .. } => ErrorKind::AlreadyRegistered,
            CourierError::Config(_) => ErrorKind::Config,
            CourierError::Storage { .. } => ErrorKind::Storage,
            CourierError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the wire-level code transport adapters expose.
    pub fn code(&self) -> ErrorCode {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::MissingVariable | ErrorKind::TypeMismatch => {
                ErrorCode::InvalidRequest
            }
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::Conflict | ErrorKind::AlreadyRegistered => ErrorCode::Conflict,
            ErrorKind::Sender | ErrorKind::Canceled | ErrorKind::HandlerNotFound => {
                ErrorCode::ExecutionError
            }
            ErrorKind::Config | ErrorKind::Storage | ErrorKind::Internal => {
                ErrorCode::InternalError
            }
        }
    }

    /// Structured fields safe to expose on the wire.
    ///
    /// Storage and internal causes are never included.
    pub fn details(&self) -> Option<serde_json::Value> {
        use serde_json::json;
        match self {
            CourierError::Validation { field, reason } => {
                Some(json!({ "field": field, "reason": reason }))
            }
            CourierError::MissingVariable { name } => Some(json!({ "variable": name })),
            CourierError::NotFound { kind, id } => Some(json!({ "kind": kind, "id": id })),
            CourierError::Conflict { kind, reason } => {
                Some(json!({ "kind": kind, "reason": reason }))
            }
            CourierError::TypeMismatch { expected, actual } => {
                Some(json!({ "expected": expected, "actual": actual }))
            }
            CourierError::Sender(err) => Some(json!({
                "code": err.code,
                "retryable": err.retryable,
                "details": err.details,
            })),
            _ => None,
        }
    }

    /// Message safe to expose on the wire.
    ///
    /// Internal and storage errors are reduced to a generic message so that
    /// cause chains never leave the process.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Storage | ErrorKind::Internal => "internal error".to_string(),
            _ => self.to_string(),
        }
    }
}
