// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete notification service with mock
//! channel types, in-memory or temp SQLite storage and an event recorder
//! attached to the service's event bus.

use std::collections::BTreeMap;
use std::sync::Arc;

use courier_config::DispatchConfig;
use courier_core::traits::ChannelType;
use courier_core::{Channel, Context, CourierError, Template};
use courier_registry::ChannelTypeRegistry;
use courier_service::{CreateChannelCommand, CreateTemplateCommand, NotificationService};
use courier_storage::{Database, Repositories};

use crate::mock_channel::MockChannelType;
use crate::recorder::EventRecorder;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    mock_types: Vec<String>,
    extra_types: Vec<Arc<dyn ChannelType>>,
    sqlite: bool,
    dispatch: DispatchConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            mock_types: Vec::new(),
            extra_types: Vec::new(),
            sqlite: false,
            dispatch: DispatchConfig::default(),
        }
    }

    /// Registers a [`MockChannelType`] under `name`.
    pub fn with_mock_type(mut self, name: impl Into<String>) -> Self {
        self.mock_types.push(name.into());
        self
    }

    /// Registers a real channel type alongside the mocks.
    pub fn with_channel_type(mut self, channel_type: Arc<dyn ChannelType>) -> Self {
        self.extra_types.push(channel_type);
        self
    }

    /// Uses SQLite in a temp directory instead of in-memory repositories.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    pub fn with_dispatch_config(mut self, config: DispatchConfig) -> Self {
        self.dispatch = config;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CourierError> {
        let (repos, temp_dir) = if self.sqlite {
            let temp_dir =
                tempfile::TempDir::new().map_err(|e| CourierError::Storage { source: e.into() })?;
            let db_path = temp_dir.path().join("test.db");
            let db = Database::open(&db_path.to_string_lossy(), true).await?;
            (Repositories::sqlite(Arc::new(db)), Some(temp_dir))
        } else {
            (Repositories::in_memory(), None)
        };

        let mut registry = ChannelTypeRegistry::new();
        let mut mocks = BTreeMap::new();
        for name in self.mock_types {
            let mock = MockChannelType::new(name.clone());
            registry.register(Arc::new(mock.clone()))?;
            mocks.insert(name, mock);
        }
        for channel_type in self.extra_types {
            registry.register(channel_type)?;
        }
        let registry = Arc::new(registry);

        let service = NotificationService::builder()
            .channels(Arc::clone(&repos.channels))
            .templates(Arc::clone(&repos.templates))
            .messages(Arc::clone(&repos.messages))
            .registry(Arc::clone(&registry))
            .dispatch_config(self.dispatch)
            .build()?;
        let events = EventRecorder::attach(service.event_bus());

        Ok(TestHarness {
            service: Arc::new(service),
            repos,
            registry,
            mocks,
            events,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock channel types and temp storage.
pub struct TestHarness {
    service: Arc<NotificationService>,
    /// Repositories backing the service, for direct assertions.
    pub repos: Repositories,
    pub registry: Arc<ChannelTypeRegistry>,
    mocks: BTreeMap<String, MockChannelType>,
    /// Every event the service published.
    pub events: Arc<EventRecorder>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn service(&self) -> Arc<NotificationService> {
        Arc::clone(&self.service)
    }

    /// The mock registered under `name`.
    ///
    /// # Panics
    ///
    /// Panics when no mock type with that name was registered.
    pub fn mock(&self, name: &str) -> &MockChannelType {
        self.mocks
            .get(name)
            .unwrap_or_else(|| panic!("no mock channel type named `{name}`"))
    }

    /// Creates a template through the command bus and returns it.
    pub async fn create_template(
        &self,
        command: CreateTemplateCommand,
    ) -> Result<Template, CourierError> {
        let result = self.service.execute(&Context::new(), &command).await;
        decode(result.success, result.data, result.error.map(|e| e.message))
    }

    /// Creates a channel through the command bus and returns it.
    pub async fn create_channel(
        &self,
        command: CreateChannelCommand,
    ) -> Result<Channel, CourierError> {
        let result = self.service.execute(&Context::new(), &command).await;
        decode(result.success, result.data, result.error.map(|e| e.message))
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    success: bool,
    data: Option<serde_json::Value>,
    error: Option<String>,
) -> Result<T, CourierError> {
    if !success {
        return Err(CourierError::Internal(
            error.unwrap_or_else(|| "command failed".to_string()),
        ));
    }
    let data = data.ok_or_else(|| CourierError::Internal("command returned no data".into()))?;
    serde_json::from_value(data).map_err(|e| CourierError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::traits::ChannelRepository;
    use courier_core::{EventType, Recipient};
    use courier_service::SendMessageCommand;

    #[tokio::test]
    async fn harness_sends_through_mock() {
        let harness = TestHarness::builder().with_mock_type("mock").build().await.unwrap();
        let template = harness
            .create_template(CreateTemplateCommand::new("hello", "mock", "Hi {{name}}"))
            .await
            .unwrap();
        let channel = harness
            .create_channel(
                CreateChannelCommand::new("ops", "mock")
                    .with_recipients(vec![Recipient::to("ops@example.com")]),
            )
            .await
            .unwrap();

        let send = SendMessageCommand::new(vec![channel.id.clone()], template.id.clone())
            .with_variables(serde_json::json!({"name": "Ada"}).as_object().cloned().unwrap());
        let result = harness.service().execute(&Context::new(), &send).await;
        assert!(result.success, "{result:?}");

        let sent = harness.mock("mock").sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content.body, "Hi Ada");
        assert!(harness.events.types().contains(&EventType::MessageSent));
    }

    #[tokio::test]
    async fn sqlite_harness_persists_channels() {
        let harness = TestHarness::builder()
            .with_mock_type("mock")
            .with_sqlite()
            .build()
            .await
            .unwrap();
        let channel = harness
            .create_channel(CreateChannelCommand::new("ops", "mock"))
            .await
            .unwrap();
        let stored = harness.repos.channels.find_by_id(&channel.id).await.unwrap();
        assert_eq!(stored.map(|c| c.name), Some("ops".to_string()));
    }
}
