// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable channel type and in-memory fixture for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use courier_config::DispatchConfig;
use courier_core::traits::{ChannelRepository, ChannelType, Sender, TemplateRepository};
use courier_core::{
    Channel, Context, CourierError, Recipient, RenderedContent, SendReceipt, SenderError, Template,
};
use courier_registry::ChannelTypeRegistry;
use courier_storage::{MemoryChannelRepository, MemoryMessageRepository, MemoryTemplateRepository};
use serde_json::{Value, json};

use crate::dispatcher::MessageDispatcher;
use crate::service::NotificationService;

#[derive(Clone)]
pub(crate) enum Step {
    Fail(SenderError),
    Sleep(Duration),
    Panic,
}

#[derive(Debug, Clone)]
pub(crate) struct Delivery {
    pub content: RenderedContent,
    pub recipients: Vec<Recipient>,
}

#[derive(Default)]
struct StubState {
    name: String,
    scripts: Mutex<HashMap<String, Step>>,
    calls: Mutex<HashMap<String, u32>>,
    deliveries: Mutex<Vec<Delivery>>,
}

/// Channel type whose sender behavior is scripted per channel name.
/// Unscripted channels succeed.
#[derive(Clone)]
pub(crate) struct StubType(Arc<StubState>);

impl StubType {
    pub fn new(name: &str) -> Self {
        Self(Arc::new(StubState {
            name: name.to_string(),
            ..StubState::default()
        }))
    }

    pub fn script(&self, channel: &str, step: Step) {
        self.0.scripts.lock().unwrap().insert(channel.to_string(), step);
    }

    pub fn calls(&self, channel: &str) -> u32 {
        self.0.calls.lock().unwrap().get(channel).copied().unwrap_or(0)
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.0.deliveries.lock().unwrap().clone()
    }
}

impl ChannelType for StubType {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn display_name(&self) -> &str {
        "Stub"
    }

    fn description(&self) -> &str {
        "scripted test channel"
    }

    fn config_schema(&self) -> Value {
        json!({"type": "object", "properties": {"region": {"type": "string"}}})
    }

    fn create_sender(&self, _timeout: Duration) -> Result<Arc<dyn Sender>, CourierError> {
        Ok(Arc::new(StubSender(Arc::clone(&self.0))))
    }
}

struct StubSender(Arc<StubState>);

#[async_trait]
impl Sender for StubSender {
    async fn send(
        &self,
        _ctx: &Context,
        channel: &Channel,
        content: &RenderedContent,
        recipients: &[Recipient],
    ) -> Result<SendReceipt, SenderError> {
        *self.0.calls.lock().unwrap().entry(channel.name.clone()).or_default() += 1;
        let step = self.0.scripts.lock().unwrap().get(&channel.name).cloned();
        match step {
            Some(Step::Fail(e)) => return Err(e),
            Some(Step::Sleep(d)) => tokio::time::sleep(d).await,
            Some(Step::Panic) => panic!("scripted panic"),
            None => {}
        }
        self.0.deliveries.lock().unwrap().push(Delivery {
            content: content.clone(),
            recipients: recipients.to_vec(),
        });
        Ok(SendReceipt::new(format!("sent to {} recipient(s)", recipients.len())))
    }
}

pub(crate) struct Fixture {
    pub channels: Arc<MemoryChannelRepository>,
    pub templates: Arc<MemoryTemplateRepository>,
    pub messages: Arc<MemoryMessageRepository>,
    pub registry: Arc<ChannelTypeRegistry>,
    pub dispatcher: MessageDispatcher,
}

impl Fixture {
    pub async fn template(&self, template: Template) -> Template {
        self.templates.save(&template).await.unwrap();
        template
    }

    pub async fn channel(&self, channel: Channel) -> Channel {
        self.channels.save(&channel).await.unwrap();
        channel
    }

    pub fn service(&self) -> NotificationService {
        NotificationService::builder()
            .channels(self.channels.clone())
            .templates(self.templates.clone())
            .messages(self.messages.clone())
            .registry(Arc::clone(&self.registry))
            .build()
            .unwrap()
    }
}

pub(crate) async fn fixture(types: Vec<StubType>) -> Fixture {
    let mut registry = ChannelTypeRegistry::new();
    for t in types {
        registry.register(Arc::new(t)).unwrap();
    }
    let registry = Arc::new(registry);
    let channels = Arc::new(MemoryChannelRepository::new());
    let templates = Arc::new(MemoryTemplateRepository::new());
    let messages = Arc::new(MemoryMessageRepository::new());
    let dispatcher = MessageDispatcher::new(
        channels.clone(),
        templates.clone(),
        messages.clone(),
        Arc::clone(&registry),
        &DispatchConfig::default(),
    );
    Fixture {
        channels,
        templates,
        messages,
        registry,
        dispatcher,
    }
}
