// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-subscriber event bus.
//!
//! Subscribers are kept per [`EventType`] in registration order. Publishing
//! snapshots the subscriber list under a read lock and then calls each
//! subscriber outside the lock, so a handler may subscribe or unsubscribe
//! without deadlocking. A failing subscriber is logged and the remaining
//! subscribers still run.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use courier_core::{CourierError, DomainEvent, EventType};
use tracing::{debug, warn};

/// Receives published domain events.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), CourierError>;
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Subscribers = Vec<(SubscriptionId, Arc<dyn EventHandler>)>;

/// In-process publish/subscribe hub for [`DomainEvent`]s.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<EventType, Subscribers>>,
    next_id: AtomicU64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<String, usize> = subscribers
            .iter()
            .map(|(ty, subs)| (ty.to_string(), subs.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the subscribers of `event_type`.
    pub fn subscribe(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        debug!(event_type = %event_type, subscriber = handler.name(), subscription = %id, "subscribed");
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type)
            .or_default()
            .push((id, handler));
        id
    }

    /// Removes a subscription. Unknown ids are an error.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), CourierError> {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for subs in subscribers.values_mut() {
            if let Some(pos) = subs.iter().position(|(sid, _)| *sid == id) {
                subs.remove(pos);
                debug!(subscription = %id, "unsubscribed");
                return Ok(());
            }
        }
        Err(CourierError::not_found("subscription", id.to_string()))
    }

    pub fn subscriber_count(&self, event_type: EventType) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    /// Delivers one event to its subscribers in registration order.
    ///
    /// Subscriber errors are logged, never returned. The only error is a
    /// malformed event.
    pub async fn publish(&self, event: &DomainEvent) -> Result<(), CourierError> {
        if event.aggregate_id.trim().is_empty() {
            return Err(CourierError::validation(
                "aggregateId",
                "event must reference an aggregate",
            ));
        }

        let snapshot: Subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        debug!(
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            subscribers = snapshot.len(),
            "publishing event"
        );

        for (id, handler) in snapshot {
            if let Err(e) = handler.handle(event).await {
                warn!(
                    event_type = %event.event_type,
                    subscriber = handler.name(),
                    subscription = %id,
                    error = %e,
                    "event subscriber failed"
                );
            }
        }
        Ok(())
    }

    /// Publishes events in order. An empty batch is a no-op.
    ///
    /// A rejected event does not stop the rest of the batch; the first
    /// rejection is returned once every event has been tried.
    pub async fn publish_batch(&self, events: &[DomainEvent]) -> Result<(), CourierError> {
        let mut first_err = None;
        for event in events {
            if let Err(e) = self.publish(event).await {
                warn!(event_type = %event.event_type, error = %e, "event rejected");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
