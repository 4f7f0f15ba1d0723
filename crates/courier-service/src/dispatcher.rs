// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The send pipeline.
//!
//! `MessageDispatcher::dispatch` resolves every channel and the template,
//! renders once, persists a pending skeleton, fans out one spawned task per
//! channel, then records the results and persists the final aggregate in a
//! single write. Resolution failures abort before anything is stored;
//! per-channel failures become `failed` results and never abort siblings.
//!
//! Everything after the skeleton save runs in a spawned task. If the caller
//! is dropped mid-send, outstanding channels are canceled and the message is
//! still finalized, persisted and announced on the event bus.

use std::sync::Arc;
use std::time::Duration;

use courier_bus::EventBus;
use courier_config::DispatchConfig;
use courier_core::domain::merge_recipients;
use courier_core::traits::{ChannelRepository, MessageRepository, Sender, TemplateRepository};
use courier_core::{
    Channel, CommonSettings, Context, CourierError, DeliveryCode, Message, MessageId,
    MessageResult, Recipient, RenderedContent, SendReceipt, SenderError, Template,
};
use courier_registry::{ChannelTypeEntry, ChannelTypeRegistry};
use tokio::sync::{Semaphore, oneshot};
use tracing::{debug, info, warn};

use crate::events;
use crate::render::{render_template, render_text};

/// Runs the resolve, render, dispatch and aggregate steps for a message.
pub struct MessageDispatcher {
    channels: Arc<dyn ChannelRepository>,
    templates: Arc<dyn TemplateRepository>,
    messages: Arc<dyn MessageRepository>,
    registry: Arc<ChannelTypeRegistry>,
    event_bus: Option<Arc<EventBus>>,
    max_concurrency: usize,
    max_retry_attempts: u32,
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("max_concurrency", &self.max_concurrency)
            .field("max_retry_attempts", &self.max_retry_attempts)
            .finish()
    }
}

/// Everything one channel's dispatch task needs, owned.
struct Slot {
    channel: Channel,
    content: RenderedContent,
    recipients: Vec<Recipient>,
    settings: CommonSettings,
    entry: Arc<ChannelTypeEntry>,
}

impl MessageDispatcher {
    pub fn new(
        channels: Arc<dyn ChannelRepository>,
        templates: Arc<dyn TemplateRepository>,
        messages: Arc<dyn MessageRepository>,
        registry: Arc<ChannelTypeRegistry>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            channels,
            templates,
            messages,
            registry,
            event_bus: None,
            max_concurrency: config.max_concurrency.max(1),
            max_retry_attempts: config.max_retry_attempts,
        }
    }

    /// Bus used to announce outcomes of sends whose caller went away.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Delivers `message` to all of its channels and returns the finalized
    /// aggregate.
    ///
    /// Errors are returned only for failures before dispatch (missing
    /// channel or template, type mismatch, render or config errors) and for
    /// storage failures. Delivery failures live in the message's results.
    pub async fn dispatch(&self, ctx: &Context, message: Message) -> Result<Message, CourierError> {
        if message.channel_ids.is_empty() {
            return Err(CourierError::Internal(
                "message reached dispatch without channels".to_string(),
            ));
        }
        let slots = self.resolve(&message).await?;

        self.messages.save(&message).await?;
        info!(
            message_id = %message.id,
            template_id = %message.template_id,
            channels = slots.len(),
            "dispatching message"
        );

        // Dropping the caller cancels the run; the spawned tail still
        // records, persists and announces the outcome.
        let run = ctx.child();
        let guard = run.token().clone().drop_guard();
        let (tx, rx) = oneshot::channel();
        let tail = Tail {
            messages: Arc::clone(&self.messages),
            event_bus: self.event_bus.clone(),
            permits: Arc::new(Semaphore::new(self.max_concurrency)),
        };
        tokio::spawn(async move {
            let outcome = tail.finish(run, message, slots).await;
            if let Err(unclaimed) = tx.send(outcome) {
                tail.announce_detached(unclaimed).await;
            }
        });

        let outcome = rx
            .await
            .map_err(|_| CourierError::Internal("dispatch task ended without a result".to_string()))?;
        guard.disarm();
        outcome
    }

    async fn resolve(&self, message: &Message) -> Result<Vec<Slot>, CourierError> {
        let mut channels = Vec::with_capacity(message.channel_ids.len());
        for id in &message.channel_ids {
            let channel = self
                .channels
                .find_by_id(id)
                .await?
                .ok_or_else(|| CourierError::not_found("channel", id.as_str()))?;
            channels.push(channel);
        }
        let template = self
            .templates
            .find_by_id(&message.template_id)
            .await?
            .ok_or_else(|| CourierError::not_found("template", message.template_id.as_str()))?;
        if let Some(channel) = channels
            .iter()
            .find(|c| c.channel_type != template.channel_type)
        {
            return Err(CourierError::type_mismatch(
                &template.channel_type,
                &channel.channel_type,
            ));
        }

        let base = render_template(&template, &message.variables)?;
        channels
            .into_iter()
            .map(|channel| self.plan(message, &template, &base, channel))
            .collect()
    }

    fn plan(
        &self,
        message: &Message,
        template: &Template,
        base: &RenderedContent,
        mut channel: Channel,
    ) -> Result<Slot, CourierError> {
        let entry = self.registry.get(&channel.channel_type)?;
        let overrides = message.overrides.get(&channel.id);

        let mut content = base.clone();
        if let Some(o) = overrides {
            if let Some(subject) = &o.subject {
                content.subject = render_text(subject, &message.variables, &template.variables)?;
            }
            if let Some(body) = &o.body {
                content.body = render_text(body, &message.variables, &template.variables)?;
            }
            if let Some(config) = &o.config {
                channel
                    .config
                    .extend(config.iter().map(|(k, v)| (k.clone(), v.clone())));
                entry.channel_type().validate_config(&channel.config)?;
            }
        }

        let override_recipients = overrides.map(|o| o.recipients.as_slice()).unwrap_or(&[]);
        let merged = merge_recipients([
            message.recipients.as_slice(),
            override_recipients,
            channel.recipients.as_slice(),
        ]);
        let accepted = entry.channel_type().recipient_types();
        let (recipients, dropped): (Vec<_>, Vec<_>) =
            merged.into_iter().partition(|r| accepted.contains(&r.kind));
        if !dropped.is_empty() {
            warn!(
                channel_id = %channel.id,
                channel_type = %channel.channel_type,
                dropped = dropped.len(),
                "dropping recipients with unsupported types"
            );
        }

        let mut settings = message.settings.effective(&channel.settings);
        settings.retry_attempts = settings.retry_attempts.min(self.max_retry_attempts);

        Ok(Slot {
            channel,
            content,
            recipients,
            settings,
            entry,
        })
    }
}

/// The part of a dispatch that must finish even if the caller goes away.
struct Tail {
    messages: Arc<dyn MessageRepository>,
    event_bus: Option<Arc<EventBus>>,
    permits: Arc<Semaphore>,
}

impl Tail {
    async fn finish(
        &self,
        ctx: Context,
        mut message: Message,
        slots: Vec<Slot>,
    ) -> Result<Message, CourierError> {
        let tasks: Vec<_> = slots
            .into_iter()
            .map(|slot| {
                let channel_id = slot.channel.id.clone();
                let task = tokio::spawn(slot.run(
                    ctx.clone(),
                    Arc::clone(&self.permits),
                    message.id.clone(),
                ));
                (channel_id, task)
            })
            .collect();

        for (channel_id, task) in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    warn!(message_id = %message.id, channel_id = %channel_id, "sender panicked");
                    MessageResult::failed(channel_id, &SenderError::internal("sender panicked"), 1)
                }
                Err(_) => MessageResult::failed(channel_id, &SenderError::canceled(), 0),
            };
            message.record_result(result)?;
        }

        let status = message.finalize();
        self.messages.save(&message).await?;
        info!(message_id = %message.id, status = %status, "message dispatched");
        Ok(message)
    }

    /// Publishes the outcome event when nobody is left to return it to.
    async fn announce_detached(&self, outcome: Result<Message, CourierError>) {
        let message = match outcome {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "detached dispatch failed");
                return;
            }
        };
        debug!(message_id = %message.id, "caller gone, publishing outcome directly");
        let Some(bus) = &self.event_bus else {
            return;
        };
        if let Err(e) = bus.publish(&events::message_outcome(&message)).await {
            warn!(message_id = %message.id, error = %e, "event publish failed");
        }
    }
}

impl Slot {
    async fn run(self, ctx: Context, permits: Arc<Semaphore>, message_id: MessageId) -> MessageResult {
        let channel_id = self.channel.id.clone();
        if !self.channel.enabled {
            return MessageResult::failed(
                channel_id,
                &SenderError::new(DeliveryCode::ChannelDisabled, "channel is disabled"),
                0,
            );
        }
        if self.recipients.is_empty() {
            return MessageResult::failed(
                channel_id,
                &SenderError::new(DeliveryCode::NoRecipients, "no recipients after merge"),
                0,
            );
        }

        let _permit = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                return MessageResult::failed(channel_id, &SenderError::canceled(), 0);
            }
            permit = permits.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    return MessageResult::failed(
                        channel_id,
                        &SenderError::internal("dispatch pool closed"),
                        0,
                    );
                }
            },
        };

        let timeout = self.settings.timeout();
        let sender = match self.entry.sender(timeout) {
            Ok(sender) => sender,
            Err(e) => {
                return MessageResult::failed(channel_id, &SenderError::internal(e.to_string()), 0);
            }
        };

        let mut attempts = 0;
        let outcome = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(SenderError::canceled()),
            res = tokio::time::timeout(timeout, self.send_with_retries(&ctx, sender.as_ref(), &mut attempts)) => {
                res.unwrap_or_else(|_| {
                    Err(SenderError::timeout(format!(
                        "no response within {} ms",
                        timeout.as_millis()
                    )))
                })
            }
        };

        match outcome {
            Ok(receipt) => {
                debug!(
                    message_id = %message_id,
                    channel_id = %channel_id,
                    attempts,
                    "channel delivered"
                );
                MessageResult::success(channel_id, receipt.message, receipt.sent_at, attempts)
            }
            Err(e) => {
                warn!(
                    message_id = %message_id,
                    channel_id = %channel_id,
                    code = %e.code,
                    attempts,
                    error = %e.details,
                    "channel delivery failed"
                );
                MessageResult::failed(channel_id, &e, attempts)
            }
        }
    }

    async fn send_with_retries(
        &self,
        ctx: &Context,
        sender: &dyn Sender,
        attempts: &mut u32,
    ) -> Result<SendReceipt, SenderError> {
        let max_attempts = self.settings.retry_attempts.saturating_add(1);
        loop {
            *attempts += 1;
            match sender
                .send(ctx, &self.channel, &self.content, &self.recipients)
                .await
            {
                Ok(receipt) => return Ok(receipt),
                Err(e) if e.retryable && *attempts < max_attempts => {
                    debug!(
                        channel_id = %self.channel.id,
                        attempt = *attempts,
                        code = %e.code,
                        "retrying send"
                    );
                    sleep_unless_zero(self.settings.retry_delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn sleep_unless_zero(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Step, StubType, fixture};
    use courier_core::{ChannelId, ChannelOverride, MessageSettings, MessageStatus, Template};
    use serde_json::json;

    fn message(channels: &[&Channel], template: &Template) -> Message {
        let ids: Vec<ChannelId> = channels.iter().map(|c| c.id.clone()).collect();
        Message::new(&ids, template.id.clone()).unwrap()
    }

    #[tokio::test]
    async fn renders_and_delivers() {
        let stub = StubType::new("email");
        let fx = fixture(vec![stub.clone()]).await;
        let t = fx.template(Template::new("t", "email", "Code {{c}}").with_subject("Hi {{n}}")).await;
        let c = fx.channel(Channel::new("c", "email").with_recipients(vec![Recipient::to("a@x")])).await;

        let msg = message(&[&c], &t).with_variables(
            json!({"n": "Jo", "c": 42}).as_object().cloned().unwrap(),
        );
        let out = fx.dispatcher.dispatch(&Context::new(), msg).await.unwrap();

        assert_eq!(out.status, MessageStatus::Success);
        let seen = stub.deliveries();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].content.subject, "Hi Jo");
        assert_eq!(seen[0].content.body, "Code 42");
        assert_eq!(fx.messages.save_count(), 2);
    }

    #[tokio::test]
    async fn retries_only_retryable_errors() {
        let stub = StubType::new("email");
        let fx = fixture(vec![stub.clone()]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let flaky = fx.channel(Channel::new("flaky", "email").with_recipients(vec![Recipient::to("a")])).await;
        let locked = fx.channel(Channel::new("locked", "email").with_recipients(vec![Recipient::to("b")])).await;
        stub.script("flaky", Step::Fail(SenderError::transport("reset")));
        stub.script("locked", Step::Fail(SenderError::auth("bad key")));

        let msg = message(&[&flaky, &locked], &t).with_settings(MessageSettings {
            retry_attempts: Some(2),
            retry_delay_ms: Some(0),
            ..MessageSettings::default()
        });
        let out = fx.dispatcher.dispatch(&Context::new(), msg).await.unwrap();

        assert_eq!(out.status, MessageStatus::Failed);
        assert_eq!(stub.calls("flaky"), 3);
        assert_eq!(stub.calls("locked"), 1);
        assert_eq!(out.result_for(&flaky.id).unwrap().attempts, 3);
        assert_eq!(out.result_for(&locked.id).unwrap().error_code, Some(DeliveryCode::Auth));
    }

    #[tokio::test]
    async fn retry_attempts_are_capped_by_config() {
        let stub = StubType::new("email");
        let fx = fixture(vec![stub.clone()]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let c = fx.channel(Channel::new("c", "email").with_recipients(vec![Recipient::to("a")])).await;
        stub.script("c", Step::Fail(SenderError::rate_limited("slow down")));

        let msg = message(&[&c], &t).with_settings(MessageSettings {
            retry_attempts: Some(50),
            retry_delay_ms: Some(0),
            ..MessageSettings::default()
        });
        fx.dispatcher.dispatch(&Context::new(), msg).await.unwrap();
        assert_eq!(stub.calls("c"), 1 + DispatchConfig::default().max_retry_attempts);
    }

    #[tokio::test]
    async fn type_mismatch_stores_nothing() {
        let email = StubType::new("email");
        let fx = fixture(vec![email.clone(), StubType::new("sms")]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let c = fx.channel(Channel::new("c", "sms").with_recipients(vec![Recipient::to("1")])).await;

        let err = fx
            .dispatcher
            .dispatch(&Context::new(), message(&[&c], &t))
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::TypeMismatch { .. }));
        assert_eq!(fx.messages.save_count(), 0);
        assert_eq!(email.calls("c"), 0);
    }

    #[tokio::test]
    async fn missing_channel_is_not_found() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let msg = Message::new(&[ChannelId::from("ghost")], t.id.clone()).unwrap();
        let err = fx.dispatcher.dispatch(&Context::new(), msg).await.unwrap_err();
        assert!(matches!(err, CourierError::NotFound { kind, .. } if kind == "channel"));
    }

    #[tokio::test]
    async fn empty_recipients_and_disabled_channels_skip_sender() {
        let stub = StubType::new("email");
        let fx = fixture(vec![stub.clone()]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let nobody = fx.channel(Channel::new("nobody", "email")).await;
        let off = fx
            .channel(
                Channel::new("off", "email")
                    .with_recipients(vec![Recipient::to("a")])
                    .with_enabled(false),
            )
            .await;

        let out = fx
            .dispatcher
            .dispatch(&Context::new(), message(&[&nobody, &off], &t))
            .await
            .unwrap();

        assert_eq!(
            out.result_for(&nobody.id).unwrap().error_code,
            Some(DeliveryCode::NoRecipients)
        );
        assert_eq!(
            out.result_for(&off.id).unwrap().error_code,
            Some(DeliveryCode::ChannelDisabled)
        );
        assert!(stub.deliveries().is_empty());
    }

    #[tokio::test]
    async fn recipients_merge_and_filter_by_type() {
        use courier_core::RecipientType;

        let stub = StubType::new("email");
        let fx = fixture(vec![stub.clone()]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let c = fx
            .channel(Channel::new("c", "email").with_recipients(vec![Recipient::to("dflt"), Recipient::to("dup")]))
            .await;
        let mut overrides = std::collections::BTreeMap::new();
        overrides.insert(
            c.id.clone(),
            ChannelOverride {
                body: Some("custom {{x}}".into()),
                recipients: vec![Recipient::to("extra")],
                ..ChannelOverride::default()
            },
        );
        let msg = message(&[&c], &t)
            .with_recipients(vec![
                Recipient::to("dup"),
                Recipient::to("pager").with_kind(RecipientType::Custom("pager".into())),
            ])
            .with_overrides(overrides)
            .with_variables(json!({"x": 1}).as_object().cloned().unwrap());

        fx.dispatcher.dispatch(&Context::new(), msg).await.unwrap();

        let seen = stub.deliveries();
        let targets: Vec<&str> = seen[0].recipients.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, ["dup", "extra", "dflt"]);
        assert_eq!(seen[0].content.body, "custom 1");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_sender_times_out() {
        let stub = StubType::new("email");
        let fx = fixture(vec![stub.clone()]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let c = fx.channel(Channel::new("c", "email").with_recipients(vec![Recipient::to("a")])).await;
        stub.script("c", Step::Sleep(Duration::from_secs(60)));

        let msg = message(&[&c], &t).with_settings(MessageSettings {
            timeout_ms: Some(100),
            ..MessageSettings::default()
        });
        let out = fx.dispatcher.dispatch(&Context::new(), msg).await.unwrap();
        assert_eq!(out.results[0].error_code, Some(DeliveryCode::Timeout));
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let stub = StubType::new("email");
        let fx = fixture(vec![stub.clone()]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let bad = fx.channel(Channel::new("bad", "email").with_recipients(vec![Recipient::to("a")])).await;
        let good = fx.channel(Channel::new("good", "email").with_recipients(vec![Recipient::to("b")])).await;
        stub.script("bad", Step::Panic);

        let out = fx
            .dispatcher
            .dispatch(&Context::new(), message(&[&bad, &good], &t))
            .await
            .unwrap();
        assert_eq!(out.status, MessageStatus::PartialSuccess);
        assert_eq!(out.result_for(&bad.id).unwrap().error_code, Some(DeliveryCode::Internal));
        assert!(out.result_for(&good.id).unwrap().is_success());
    }

    #[tokio::test]
    async fn cancelled_context_marks_every_slot() {
        let stub = StubType::new("email");
        let fx = fixture(vec![stub.clone()]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let c = fx.channel(Channel::new("c", "email").with_recipients(vec![Recipient::to("a")])).await;

        let ctx = Context::new();
        ctx.cancel();
        let out = fx.dispatcher.dispatch(&ctx, message(&[&c], &t)).await.unwrap();
        assert_eq!(out.status, MessageStatus::Failed);
        assert_eq!(out.results[0].error_code, Some(DeliveryCode::Canceled));
        assert_eq!(fx.messages.save_count(), 2);
    }

    #[derive(Default)]
    struct Seen(std::sync::Mutex<Vec<courier_core::DomainEvent>>);

    #[async_trait::async_trait]
    impl courier_bus::EventHandler for Seen {
        async fn handle(&self, event: &courier_core::DomainEvent) -> Result<(), CourierError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn dropped_caller_still_finalizes_and_announces() {
        let stub = StubType::new("email");
        let fx = fixture(vec![stub.clone()]).await;
        let t = fx.template(Template::new("t", "email", "b")).await;
        let c = fx.channel(Channel::new("c", "email").with_recipients(vec![Recipient::to("a")])).await;
        stub.script("c", Step::Sleep(Duration::from_millis(200)));

        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Seen::default());
        bus.subscribe(courier_core::EventType::MessageFailed, seen.clone());
        let dispatcher = MessageDispatcher::new(
            fx.channels.clone(),
            fx.templates.clone(),
            fx.messages.clone(),
            Arc::clone(&fx.registry),
            &DispatchConfig::default(),
        )
        .with_event_bus(bus);

        let msg = message(&[&c], &t);
        let id = msg.id.clone();
        let ctx = Context::new();
        let call = dispatcher.dispatch(&ctx, msg);
        assert!(tokio::time::timeout(Duration::from_millis(50), call).await.is_err());

        let mut stored = None;
        for _ in 0..100 {
            let m = fx.messages.find_by_id(&id).await.unwrap().unwrap();
            if m.status != MessageStatus::Pending && !seen.0.lock().unwrap().is_empty() {
                stored = Some(m);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let stored = stored.expect("message finalized after the caller went away");
        assert_eq!(stored.status, MessageStatus::Failed);
        assert_eq!(stored.results[0].error_code, Some(DeliveryCode::Canceled));
        assert_eq!(fx.messages.save_count(), 2);
        assert_eq!(seen.0.lock().unwrap()[0].aggregate_id, id.as_str());
    }
}
