// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event subscriber that keeps every event it sees.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use courier_bus::{EventBus, EventHandler};
use courier_core::{CourierError, DomainEvent, EventType};

/// Every event type, in declaration order.
pub const ALL_EVENT_TYPES: [EventType; 9] = [
    EventType::ChannelCreated,
    EventType::ChannelUpdated,
    EventType::ChannelDeleted,
    EventType::TemplateCreated,
    EventType::TemplateUpdated,
    EventType::TemplateDeleted,
    EventType::MessageSent,
    EventType::MessageFailed,
    EventType::MessageDelivered,
];

#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<DomainEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder subscribed to every event type on `bus`.
    pub fn attach(bus: &EventBus) -> Arc<Self> {
        let recorder = Arc::new(Self::new());
        for ty in ALL_EVENT_TYPES {
            bus.subscribe(ty, Arc::clone(&recorder) as Arc<dyn EventHandler>);
        }
        recorder
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event types in publication order.
    pub fn types(&self) -> Vec<EventType> {
        self.events().iter().map(|e| e.event_type).collect()
    }

    pub fn of_type(&self, ty: EventType) -> Vec<DomainEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type == ty)
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl EventHandler for EventRecorder {
    fn name(&self) -> &str {
        "event-recorder"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), CourierError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
