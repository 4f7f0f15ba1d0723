// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios through the service with mock channel types.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use courier_bus::EventHandler;
use courier_core::traits::{MessageRepository, TemplateRepository};
use courier_core::{
    Context, CourierError, DeliveryCode, DomainEvent, ErrorKind, EventType, ListQuery, Message,
    MessageSettings, MessageStatus, Recipient, ResultStatus,
};
use courier_service::{
    CreateChannelCommand, CreateTemplateCommand, DeleteTemplateCommand, SendMessageCommand,
};
use courier_test_utils::{MockBehavior, TestHarness};
use serde_json::json;

async fn harness() -> TestHarness {
    TestHarness::builder()
        .with_mock_type("email")
        .with_mock_type("sms")
        .build()
        .await
        .unwrap()
}

fn vars(value: serde_json::Value) -> courier_core::Variables {
    value.as_object().cloned().unwrap()
}

fn message(data: Option<serde_json::Value>) -> Message {
    serde_json::from_value(data.unwrap()).unwrap()
}

#[tokio::test]
async fn single_channel_success() {
    let h = harness().await;
    let t = h
        .create_template(
            CreateTemplateCommand::new("code", "email", "Code {{c}}").with_subject("Hi {{n}}"),
        )
        .await
        .unwrap();
    let c = h
        .create_channel(
            CreateChannelCommand::new("ops", "email")
                .with_recipients(vec![Recipient::to("jo@example.com")]),
        )
        .await
        .unwrap();
    h.events.clear();

    let send = SendMessageCommand::new(vec![c.id.clone()], t.id.clone())
        .with_variables(vars(json!({"n": "Jo", "c": "42"})));
    let result = h.service().execute(&Context::new(), &send).await;
    assert!(result.success, "{result:?}");

    let msg = message(result.data);
    let stored = h.repos.messages.find_by_id(&msg.id).await.unwrap().unwrap();
    assert_eq!(stored.status, MessageStatus::Success);
    assert_eq!(stored.results.len(), 1);
    assert_eq!(stored.results[0].channel_id, c.id);
    assert_eq!(stored.results[0].status, ResultStatus::Success);

    let sent = h.mock("email").sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content.subject, "Hi Jo");
    assert_eq!(sent[0].content.body, "Code 42");
    assert_eq!(h.events.of_type(EventType::MessageSent).len(), 1);
}

#[tokio::test]
async fn partial_success_retries_transient_failures() {
    let h = harness().await;
    let t = h
        .create_template(CreateTemplateCommand::new("t", "email", "hello"))
        .await
        .unwrap();
    let mut ids = Vec::new();
    for name in ["c1", "c2"] {
        let c = h
            .create_channel(
                CreateChannelCommand::new(name, "email")
                    .with_recipients(vec![Recipient::to("x@example.com")]),
            )
            .await
            .unwrap();
        ids.push(c.id);
    }
    h.mock("email")
        .behave("c2", MockBehavior::Fail(courier_core::SenderError::transport("reset")));

    let send = SendMessageCommand::new(ids.clone(), t.id.clone()).with_settings(MessageSettings {
        retry_attempts: Some(2),
        retry_delay_ms: Some(0),
        ..MessageSettings::default()
    });
    let result = h.service().execute(&Context::new(), &send).await;
    assert!(result.success, "{result:?}");

    let msg = message(result.data);
    assert_eq!(msg.status, MessageStatus::PartialSuccess);
    let c1 = msg.results.iter().find(|r| r.channel_id == ids[0]).unwrap();
    let c2 = msg.results.iter().find(|r| r.channel_id == ids[1]).unwrap();
    assert_eq!(c1.status, ResultStatus::Success);
    assert_eq!(c2.status, ResultStatus::Failed);
    assert_eq!(c2.error_code, Some(DeliveryCode::Transport));
    assert_eq!(h.mock("email").attempts("c2"), 3);
}

#[tokio::test]
async fn type_mismatch_aborts_without_side_effects() {
    let h = harness().await;
    let t = h
        .create_template(CreateTemplateCommand::new("t", "email", "hello"))
        .await
        .unwrap();
    let c = h
        .create_channel(
            CreateChannelCommand::new("pager", "sms").with_recipients(vec![Recipient::to("+15550100")]),
        )
        .await
        .unwrap();
    h.events.clear();

    let send = SendMessageCommand::new(vec![c.id], t.id);
    let result = h.service().execute(&Context::new(), &send).await;
    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::TypeMismatch);
    let page = h.repos.messages.list(&ListQuery::new()).await.unwrap();
    assert_eq!(page.total_count, 0);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn cancellation_mid_flight_keeps_finished_results() {
    let h = harness().await;
    let t = h
        .create_template(CreateTemplateCommand::new("t", "email", "hello"))
        .await
        .unwrap();
    let mut ids = Vec::new();
    for name in ["c1", "c2"] {
        let c = h
            .create_channel(
                CreateChannelCommand::new(name, "email")
                    .with_recipients(vec![Recipient::to("x@example.com")]),
            )
            .await
            .unwrap();
        ids.push(c.id);
    }
    h.mock("email").behave("c1", MockBehavior::BlockUntilCancelled);

    let ctx = Context::new();
    let service = h.service();
    let send = SendMessageCommand::new(ids.clone(), t.id.clone());
    let run_ctx = ctx.clone();
    let task = tokio::spawn(async move { service.execute(&run_ctx, &send).await });

    while h.mock("email").sent_count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    ctx.cancel();

    let result = task.await.unwrap();
    assert!(result.success, "{result:?}");
    let msg = message(result.data);
    let c1 = msg.results.iter().find(|r| r.channel_id == ids[0]).unwrap();
    let c2 = msg.results.iter().find(|r| r.channel_id == ids[1]).unwrap();
    assert_eq!(c2.status, ResultStatus::Success);
    assert_eq!(c1.status, ResultStatus::Failed);
    assert_eq!(c1.error_code, Some(DeliveryCode::Canceled));
    assert_eq!(msg.status, MessageStatus::PartialSuccess);
}

#[tokio::test]
async fn template_delete_blocked_by_reference() {
    let h = harness().await;
    let t = h
        .create_template(CreateTemplateCommand::new("t", "email", "hello"))
        .await
        .unwrap();
    h.create_channel(CreateChannelCommand::new("ops", "email").with_template(t.id.clone()))
        .await
        .unwrap();

    let result = h
        .service()
        .execute(&Context::new(), &DeleteTemplateCommand::new(t.id.clone()))
        .await;
    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::Conflict);
    assert!(h.repos.templates.find_by_id(&t.id).await.unwrap().is_some());
}

struct Ordered {
    label: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
    fail: bool,
}

#[async_trait]
impl EventHandler for Ordered {
    fn name(&self) -> &str {
        self.label
    }

    async fn handle(&self, _event: &DomainEvent) -> Result<(), CourierError> {
        self.log.lock().unwrap().push(self.label);
        if self.fail {
            Err(CourierError::Internal("h1 failed".into()))
        } else {
            Ok(())
        }
    }
}

#[tokio::test]
async fn event_fan_out_keeps_subscription_order() {
    let h = harness().await;
    let log = Arc::new(Mutex::new(Vec::new()));
    let service = h.service();
    for (label, fail) in [("h1", true), ("h2", false)] {
        service.subscribe(
            EventType::ChannelCreated,
            Arc::new(Ordered {
                label,
                log: Arc::clone(&log),
                fail,
            }),
        );
    }

    let result = service
        .execute(&Context::new(), &CreateChannelCommand::new("ops", "email"))
        .await;
    assert!(result.success);
    assert_eq!(*log.lock().unwrap(), vec!["h1", "h2"]);
}

#[tokio::test]
async fn sqlite_backend_persists_message_results() {
    let h = TestHarness::builder()
        .with_mock_type("email")
        .with_sqlite()
        .build()
        .await
        .unwrap();
    let t = h
        .create_template(CreateTemplateCommand::new("t", "email", "hello"))
        .await
        .unwrap();
    let c = h
        .create_channel(
            CreateChannelCommand::new("ops", "email")
                .with_recipients(vec![Recipient::to("x@example.com")]),
        )
        .await
        .unwrap();

    let send = SendMessageCommand::new(vec![c.id.clone(), c.id.clone()], t.id);
    let result = h.service().execute(&Context::new(), &send).await;
    let msg = message(result.data);
    let stored = h.repos.messages.find_by_id(&msg.id).await.unwrap().unwrap();
    assert_eq!(stored.results.len(), 1);
    assert_eq!(stored, msg);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_creates_report_conflict() {
    let h = TestHarness::builder()
        .with_mock_type("email")
        .with_sqlite()
        .build()
        .await
        .unwrap();
    for round in 0..20 {
        let name = format!("ops-{round}");
        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let svc = h.service();
                let cmd = CreateChannelCommand::new(name.clone(), "email");
                tokio::spawn(async move { svc.execute(&Context::new(), &cmd).await })
            })
            .collect();
        let mut kinds = Vec::new();
        for task in tasks {
            let result = task.await.unwrap();
            kinds.push(result.error_kind());
        }
        kinds.sort_by_key(|k| k.is_some());
        assert_eq!(kinds, vec![None, Some(ErrorKind::Conflict)]);
    }
}
