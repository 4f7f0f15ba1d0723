// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain event constructors for each aggregate.

use courier_core::{
    AggregateType, Channel, ChannelId, DomainEvent, EventType, Message, MessageStatus, Template,
};
use serde::Serialize;
use serde_json::{Value, json};

fn payload<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn channel_created(channel: &Channel) -> DomainEvent {
    DomainEvent::new(
        EventType::ChannelCreated,
        AggregateType::Channel,
        channel.id.as_str(),
        payload(channel),
    )
}

pub fn channel_updated(channel: &Channel) -> DomainEvent {
    DomainEvent::new(
        EventType::ChannelUpdated,
        AggregateType::Channel,
        channel.id.as_str(),
        payload(channel),
    )
}

pub fn channel_deleted(id: &ChannelId) -> DomainEvent {
    DomainEvent::new(
        EventType::ChannelDeleted,
        AggregateType::Channel,
        id.as_str(),
        json!({ "id": id }),
    )
}

pub fn template_created(template: &Template) -> DomainEvent {
    DomainEvent::new(
        EventType::TemplateCreated,
        AggregateType::Template,
        template.id.as_str(),
        payload(template),
    )
    .with_version(template.version)
}

pub fn template_updated(template: &Template) -> DomainEvent {
    DomainEvent::new(
        EventType::TemplateUpdated,
        AggregateType::Template,
        template.id.as_str(),
        payload(template),
    )
    .with_version(template.version)
}

pub fn template_deleted(template: &Template) -> DomainEvent {
    DomainEvent::new(
        EventType::TemplateDeleted,
        AggregateType::Template,
        template.id.as_str(),
        json!({ "id": template.id }),
    )
    .with_version(template.version)
}

/// `message.sent` for success or partial success, `message.failed` otherwise.
pub fn message_outcome(message: &Message) -> DomainEvent {
    let event_type = match message.status {
        MessageStatus::Success | MessageStatus::PartialSuccess => EventType::MessageSent,
        MessageStatus::Failed | MessageStatus::Pending => EventType::MessageFailed,
    };
    let delivered = message.results.iter().filter(|r| r.is_success()).count();
    DomainEvent::new(
        event_type,
        AggregateType::Message,
        message.id.as_str(),
        json!({
            "messageId": message.id,
            "templateId": message.template_id,
            "status": message.status,
            "channelIds": message.channel_ids,
            "delivered": delivered,
            "failed": message.results.len() - delivered,
            "results": message.results,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{MessageResult, SenderError, TemplateId};

    #[test]
    fn partial_success_is_a_sent_event() {
        let ids = [ChannelId::from("a"), ChannelId::from("b")];
        let mut msg = Message::new(&ids, TemplateId::from("t")).unwrap();
        msg.record_result(MessageResult::success(ids[0].clone(), "ok", 1, 1)).unwrap();
        msg.record_result(MessageResult::failed(ids[1].clone(), &SenderError::auth("no"), 1))
            .unwrap();
        msg.finalize();

        let event = message_outcome(&msg);
        assert_eq!(event.event_type, EventType::MessageSent);
        assert_eq!(event.payload["delivered"], 1);
        assert_eq!(event.payload["status"], "partial_success");
    }

    #[test]
    fn template_events_carry_version() {
        let mut t = Template::new("t", "email", "b");
        t.version = 4;
        assert_eq!(template_updated(&t).version, 4);
        assert_eq!(template_deleted(&t).aggregate_type, AggregateType::Template);
    }
}
