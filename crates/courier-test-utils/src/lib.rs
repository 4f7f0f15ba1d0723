// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Courier integration tests.
//!
//! Provides a scriptable channel type, an event recorder and a harness that
//! assembles a complete service without external providers.
//!
//! # Components
//!
//! - [`MockChannelType`] - channel type whose sender outcome is scripted per channel
//! - [`EventRecorder`] - event subscriber that captures everything published
//! - [`TestHarness`] - service wired to in-memory or temp SQLite storage

pub mod harness;
pub mod mock_channel;
pub mod recorder;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_channel::{MockBehavior, MockChannelType, SentMessage};
pub use recorder::EventRecorder;
