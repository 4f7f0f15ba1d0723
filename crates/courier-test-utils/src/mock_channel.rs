// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel type for deterministic testing.
//!
//! `MockChannelType` registers under any name and hands out senders that
//! capture every delivery. The outcome of a send is scripted per channel
//! name; unscripted channels succeed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::traits::{ChannelType, Sender};
use courier_core::{
    Channel, ChannelId, Context, CourierError, Recipient, RecipientType, RenderedContent,
    SendReceipt, SenderError,
};
use serde_json::{Value, json};

/// What a mock sender does for one channel.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Succeed,
    Fail(SenderError),
    /// Sleeps before succeeding. Cancellation still ends the call early.
    Delay(Duration),
    /// Waits for the context to be cancelled, then reports cancellation.
    BlockUntilCancelled,
    Panic,
}

/// One captured delivery.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub content: RenderedContent,
    pub recipients: Vec<Recipient>,
}

#[derive(Default)]
struct MockState {
    name: String,
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    attempts: Mutex<HashMap<String, u32>>,
    sent: Mutex<Vec<SentMessage>>,
}

/// A scriptable channel type.
#[derive(Clone)]
pub struct MockChannelType {
    state: Arc<MockState>,
}

impl std::fmt::Debug for MockChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChannelType")
            .field("name", &self.state.name)
            .finish()
    }
}

impl MockChannelType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: Arc::new(MockState {
                name: name.into(),
                ..MockState::default()
            }),
        }
    }

    /// Scripts the outcome for the channel with this name.
    pub fn behave(&self, channel_name: impl Into<String>, behavior: MockBehavior) {
        self.state
            .behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel_name.into(), behavior);
    }

    /// Number of send attempts made against the named channel.
    pub fn attempts(&self, channel_name: &str) -> u32 {
        self.state
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel_name)
            .copied()
            .unwrap_or(0)
    }

    /// All successful deliveries, in completion order.
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ChannelType for MockChannelType {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn display_name(&self) -> &str {
        "Mock"
    }

    fn description(&self) -> &str {
        "In-process channel that records deliveries"
    }

    fn config_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "endpoint": { "type": "string", "minLength": 1 }
            }
        })
    }

    fn create_sender(&self, _timeout: Duration) -> Result<Arc<dyn Sender>, CourierError> {
        Ok(Arc::new(MockSender {
            state: Arc::clone(&self.state),
        }))
    }

    fn recipient_types(&self) -> Vec<RecipientType> {
        vec![RecipientType::To, RecipientType::Cc]
    }
}

struct MockSender {
    state: Arc<MockState>,
}

#[async_trait]
impl Sender for MockSender {
    async fn send(
        &self,
        ctx: &Context,
        channel: &Channel,
        content: &RenderedContent,
        recipients: &[Recipient],
    ) -> Result<SendReceipt, SenderError> {
        *self
            .state
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(channel.name.clone())
            .or_default() += 1;

        let behavior = self
            .state
            .behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&channel.name)
            .cloned()
            .unwrap_or(MockBehavior::Succeed);

        match behavior {
            MockBehavior::Succeed => {}
            MockBehavior::Fail(err) => return Err(err),
            MockBehavior::Delay(d) => {
                tokio::select! {
                    _ = tokio::time::sleep(d) => {}
                    _ = ctx.cancelled() => return Err(SenderError::canceled()),
                }
            }
            MockBehavior::BlockUntilCancelled => {
                ctx.cancelled().await;
                return Err(SenderError::canceled());
            }
            MockBehavior::Panic => panic!("mock sender panicked for `{}`", channel.name),
        }

        self.state
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                channel_id: channel.id.clone(),
                channel_name: channel.name.clone(),
                content: content.clone(),
                recipients: recipients.to_vec(),
            });
        Ok(SendReceipt::new(format!("mock delivered to {} recipient(s)", recipients.len()))
            .with_provider_id(format!("mock-{}", channel.id)))
    }
}
