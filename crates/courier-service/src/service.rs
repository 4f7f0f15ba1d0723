// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The service facade that wires repositories, the registry and the buses.

use std::sync::Arc;

use courier_bus::{
    Command, CommandBus, CommandResult, EventBus, EventHandler, Query, QueryBus, QueryResult,
    SubscriptionId,
};
use courier_config::DispatchConfig;
use courier_core::traits::{ChannelRepository, MessageRepository, TemplateRepository};
use courier_core::{Context, CourierError, EventType};
use courier_registry::ChannelTypeRegistry;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::commands::{
    CreateChannelCommand, CreateTemplateCommand, DeleteChannelCommand, DeleteTemplateCommand,
    SendMessageCommand, UpdateChannelCommand, UpdateTemplateCommand,
};
use crate::dispatcher::MessageDispatcher;
use crate::handlers::{ChannelHandlers, MessageHandlers, TemplateHandlers};
use crate::queries::{
    GetChannelQuery, GetMessageQuery, GetTemplateQuery, ListChannelsQuery, ListMessagesQuery,
    ListTemplatesQuery,
};
use crate::validator::{ChannelValidator, TemplateValidator};

/// Entry point for adapters: every command and query goes through here.
pub struct NotificationService {
    commands: Arc<CommandBus>,
    queries: Arc<QueryBus>,
    events: Arc<EventBus>,
    registry: Arc<ChannelTypeRegistry>,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("commands", &self.commands)
            .field("queries", &self.queries)
            .field("channel_types", &self.registry.names())
            .finish()
    }
}

impl NotificationService {
    pub fn builder() -> NotificationServiceBuilder {
        NotificationServiceBuilder::default()
    }

    /// Runs a command. Failures are reported inside the result.
    pub async fn execute<C: Command>(&self, ctx: &Context, command: &C) -> CommandResult {
        self.commands.execute(ctx, command).await
    }

    /// Runs a query and wraps its serialized output.
    pub async fn query<Q: Query>(&self, ctx: &Context, query: &Q) -> QueryResult {
        self.queries.execute(ctx, query).await
    }

    /// Runs a query and returns its typed output.
    pub async fn ask<Q: Query>(&self, ctx: &Context, query: &Q) -> Result<Q::Output, CourierError> {
        self.queries.ask(ctx, query).await
    }

    pub fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.events.subscribe(event_type, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), CourierError> {
        self.events.unsubscribe(id)
    }

    pub fn registry(&self) -> &Arc<ChannelTypeRegistry> {
        &self.registry
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn command_bus(&self) -> &Arc<CommandBus> {
        &self.commands
    }

    pub fn query_bus(&self) -> &Arc<QueryBus> {
        &self.queries
    }

    /// Releases every cached sender.
    pub async fn shutdown(&self) {
        info!("shutting down notification service");
        self.registry.cleanup().await;
    }
}

#[derive(Default)]
pub struct NotificationServiceBuilder {
    channels: Option<Arc<dyn ChannelRepository>>,
    templates: Option<Arc<dyn TemplateRepository>>,
    messages: Option<Arc<dyn MessageRepository>>,
    registry: Option<Arc<ChannelTypeRegistry>>,
    dispatch: DispatchConfig,
    events: Option<Arc<EventBus>>,
}

impl NotificationServiceBuilder {
    pub fn channels(mut self, repo: Arc<dyn ChannelRepository>) -> Self {
        self.channels = Some(repo);
        self
    }

    pub fn templates(mut self, repo: Arc<dyn TemplateRepository>) -> Self {
        self.templates = Some(repo);
        self
    }

    pub fn messages(mut self, repo: Arc<dyn MessageRepository>) -> Self {
        self.messages = Some(repo);
        self
    }

    pub fn registry(mut self, registry: Arc<ChannelTypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn dispatch_config(mut self, config: DispatchConfig) -> Self {
        self.dispatch = config;
        self
    }

    /// Shares an existing event bus instead of creating one.
    pub fn event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Wires handlers for every command and query.
    pub fn build(self) -> Result<NotificationService, CourierError> {
        let channels = self.channels.ok_or_else(|| missing("channel repository"))?;
        let templates = self.templates.ok_or_else(|| missing("template repository"))?;
        let messages = self.messages.ok_or_else(|| missing("message repository"))?;
        let registry = self.registry.ok_or_else(|| missing("channel type registry"))?;
        let events = self.events.unwrap_or_default();

        let commands = Arc::new(CommandBus::with_event_bus(Arc::clone(&events)));
        let queries = Arc::new(QueryBus::new());

        let writes = Arc::new(Mutex::new(()));
        let channel_handlers = Arc::new(ChannelHandlers::new(
            Arc::clone(&channels),
            ChannelValidator::new(
                Arc::clone(&channels),
                Arc::clone(&templates),
                Arc::clone(&registry),
            ),
            Arc::clone(&writes),
        ));
        let template_handlers = Arc::new(TemplateHandlers::new(
            Arc::clone(&templates),
            TemplateValidator::new(
                Arc::clone(&channels),
                Arc::clone(&templates),
                Arc::clone(&registry),
            ),
            writes,
        ));
        let dispatcher = Arc::new(
            MessageDispatcher::new(
                channels,
                templates,
                Arc::clone(&messages),
                Arc::clone(&registry),
                &self.dispatch,
            )
            .with_event_bus(Arc::clone(&events)),
        );
        let message_handlers = Arc::new(MessageHandlers::new(messages, dispatcher));

        commands.register::<CreateChannelCommand>(channel_handlers.clone())?;
        commands.register::<UpdateChannelCommand>(channel_handlers.clone())?;
        commands.register::<DeleteChannelCommand>(channel_handlers.clone())?;
        commands.register::<CreateTemplateCommand>(template_handlers.clone())?;
        commands.register::<UpdateTemplateCommand>(template_handlers.clone())?;
        commands.register::<DeleteTemplateCommand>(template_handlers.clone())?;
        commands.register::<SendMessageCommand>(message_handlers.clone())?;

        queries.register::<GetChannelQuery>(channel_handlers.clone())?;
        queries.register::<ListChannelsQuery>(channel_handlers)?;
        queries.register::<GetTemplateQuery>(template_handlers.clone())?;
        queries.register::<ListTemplatesQuery>(template_handlers)?;
        queries.register::<GetMessageQuery>(message_handlers.clone())?;
        queries.register::<ListMessagesQuery>(message_handlers)?;

        debug!(
            commands = ?commands.registered_types(),
            queries = ?queries.registered_types(),
            "notification service wired"
        );

        Ok(NotificationService {
            commands,
            queries,
            events,
            registry,
        })
    }
}

fn missing(what: &str) -> CourierError {
    CourierError::Config(format!("notification service needs a {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubType, fixture};
    use async_trait::async_trait;
    use courier_core::{
        Channel, ChannelPatch, DomainEvent, ErrorKind, ListQuery, Message, MessageStatus,
        Recipient, Template, TemplatePatch,
    };
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<DomainEvent>>);

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: &DomainEvent) -> Result<(), CourierError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn build_requires_every_repository() {
        let err = NotificationService::builder().build().unwrap_err();
        assert!(matches!(err, CourierError::Config(_)));
    }

    #[tokio::test]
    async fn every_message_type_is_registered() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let svc = fx.service();
        assert_eq!(svc.command_bus().registered_types().len(), 7);
        assert_eq!(svc.query_bus().registered_types().len(), 6);
    }

    #[tokio::test]
    async fn crud_and_send_through_the_buses() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let svc = fx.service();
        let ctx = Context::new();
        let recorder = Arc::new(Recorder::default());
        svc.subscribe(EventType::TemplateCreated, recorder.clone());
        svc.subscribe(EventType::MessageSent, recorder.clone());

        let created = svc
            .execute(
                &ctx,
                &CreateTemplateCommand::new("welcome", "email", "Hi {{name}}").with_subject("Hey"),
            )
            .await;
        assert!(created.success, "{created:?}");
        let template: Template = serde_json::from_value(created.data.unwrap()).unwrap();

        let created = svc
            .execute(
                &ctx,
                &CreateChannelCommand::new("ops", "email")
                    .with_template(template.id.clone())
                    .with_recipients(vec![Recipient::to("a@x")]),
            )
            .await;
        assert!(created.success, "{created:?}");
        let channel: Channel = serde_json::from_value(created.data.unwrap()).unwrap();

        let vars = json!({"name": "Jo"}).as_object().cloned().unwrap();
        let sent = svc
            .execute(
                &ctx,
                &SendMessageCommand::new(vec![channel.id.clone()], template.id.clone())
                    .with_variables(vars),
            )
            .await;
        assert!(sent.success, "{sent:?}");
        let message: Message = serde_json::from_value(sent.data.unwrap()).unwrap();
        assert_eq!(message.status, MessageStatus::Success);

        let stored = svc
            .ask(&ctx, &GetMessageQuery::new(message.id.clone()))
            .await
            .unwrap();
        assert_eq!(stored, message);

        let events = recorder.0.lock().unwrap().clone();
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![EventType::TemplateCreated, EventType::MessageSent]);
    }

    #[tokio::test]
    async fn unknown_channel_type_is_validation() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let svc = fx.service();
        let result = svc
            .execute(&Context::new(), &CreateChannelCommand::new("x", "pigeon"))
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn duplicate_channel_name_is_conflict() {
        let fx = fixture(vec![StubType::new("email")]).await;
        fx.channel(Channel::new("ops", "email")).await;
        let svc = fx.service();
        let result = svc
            .execute(&Context::new(), &CreateChannelCommand::new("ops", "email"))
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Conflict));
        assert!(result.events.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_same_name_creates_yield_one_conflict() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let svc = Arc::new(fx.service());
        for round in 0..20 {
            let name = format!("ops-{round}");
            let spawn = |svc: Arc<NotificationService>, name: String| {
                tokio::spawn(async move {
                    svc.execute(&Context::new(), &CreateChannelCommand::new(name, "email"))
                        .await
                })
            };
            let a = spawn(Arc::clone(&svc), name.clone());
            let b = spawn(Arc::clone(&svc), name.clone());
            let (a, b) = (a.await.unwrap(), b.await.unwrap());

            assert_eq!(a.success as u8 + b.success as u8, 1, "{a:?} {b:?}");
            let loser = if a.success { b } else { a };
            assert_eq!(loser.error_kind(), Some(ErrorKind::Conflict));
        }
        assert_eq!(fx.channels.row_count(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn template_delete_racing_channel_create_keeps_references_live() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let svc = Arc::new(fx.service());
        for round in 0..20 {
            let t = fx.template(Template::new(format!("t-{round}"), "email", "b")).await;
            let create = {
                let svc = Arc::clone(&svc);
                let cmd = CreateChannelCommand::new(format!("ops-{round}"), "email")
                    .with_template(t.id.clone());
                tokio::spawn(async move { svc.execute(&Context::new(), &cmd).await })
            };
            let delete = {
                let svc = Arc::clone(&svc);
                let cmd = DeleteTemplateCommand::new(t.id.clone());
                tokio::spawn(async move { svc.execute(&Context::new(), &cmd).await })
            };
            let (created, deleted) = (create.await.unwrap(), delete.await.unwrap());

            assert!(
                created.success != deleted.success,
                "exactly one write wins: {created:?} {deleted:?}"
            );
            let template_live = fx.templates.find_by_id(&t.id).await.unwrap().is_some();
            assert_eq!(template_live, created.success);
        }
    }

    #[tokio::test]
    async fn channel_type_cannot_change() {
        let fx = fixture(vec![StubType::new("email"), StubType::new("sms")]).await;
        let ch = fx.channel(Channel::new("ops", "email")).await;
        let svc = fx.service();
        let patch = ChannelPatch {
            channel_type: Some("sms".into()),
            ..ChannelPatch::default()
        };
        let result = svc
            .execute(&Context::new(), &UpdateChannelCommand::new(ch.id, patch))
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn referenced_template_cannot_be_deleted_or_retyped() {
        let fx = fixture(vec![StubType::new("email"), StubType::new("sms")]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        fx.channel(Channel::new("ops", "email").with_template(t.id.clone()))
            .await;
        let svc = fx.service();
        let ctx = Context::new();

        let result = svc
            .execute(&ctx, &DeleteTemplateCommand::new(t.id.clone()))
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Conflict));

        let patch = TemplatePatch {
            channel_type: Some("sms".into()),
            ..TemplatePatch::default()
        };
        let result = svc
            .execute(&ctx, &UpdateTemplateCommand::new(t.id.clone(), patch))
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn template_update_bumps_version() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let svc = fx.service();
        let patch = TemplatePatch {
            body: Some("new body".into()),
            ..TemplatePatch::default()
        };
        let result = svc
            .execute(&Context::new(), &UpdateTemplateCommand::new(t.id.clone(), patch))
            .await;
        assert!(result.success);
        assert_eq!(result.events[0].version, 2);
        let stored = svc
            .ask(&Context::new(), &GetTemplateQuery::new(t.id))
            .await
            .unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.body, "new body");
    }

    #[tokio::test]
    async fn deleted_channel_is_not_found() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let ch = fx.channel(Channel::new("ops", "email")).await;
        let svc = fx.service();
        let ctx = Context::new();
        assert!(svc.execute(&ctx, &DeleteChannelCommand::new(ch.id.clone())).await.success);

        let result = svc.query(&ctx, &GetChannelQuery::new(ch.id.clone())).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
        let page = svc
            .ask(&ctx, &ListChannelsQuery::new(ListQuery::new()))
            .await
            .unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn failed_send_reports_message_failed() {
        let stub = StubType::new("email");
        stub.script(
            "ops",
            crate::testing::Step::Fail(courier_core::SenderError::auth("bad key")),
        );
        let fx = fixture(vec![stub]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let ch = fx
            .channel(Channel::new("ops", "email").with_recipients(vec![Recipient::to("a")]))
            .await;
        let svc = fx.service();
        let result = svc
            .execute(&Context::new(), &SendMessageCommand::new(vec![ch.id], t.id))
            .await;
        assert!(result.success);
        assert_eq!(result.events[0].event_type, EventType::MessageFailed);
    }
}
