// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External surfaces of the notification service.
//!
//! - [`server`] serves the REST API on axum.
//! - [`broker`] routes subject-addressed request/reply envelopes; the REST
//!   API exposes it at `POST /v1/rpc/{subject}`.

pub mod broker;
pub mod envelope;
pub mod handlers;
pub mod server;

pub use broker::{BrokerRouter, SUBJECTS};
pub use envelope::{EnvelopeError, RequestEnvelope, ResponseEnvelope};
pub use server::{GatewayState, ServerConfig, router, start_server};
