// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command bus: one handler per command type.
//!
//! Handlers are stored type-erased, keyed by [`Command::COMMAND_TYPE`], and
//! recovered by downcasting on lookup. `execute` validates the command,
//! invokes its handler, wraps the outcome in a [`CommandResult`] and, on
//! success, publishes the handler's events on the attached [`EventBus`].

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use courier_core::{Context, CourierError, DomainEvent, ErrorKind, RequestId, Timestamp, now_millis};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::event::EventBus;
use crate::result::CommandResult;

/// A request to change state.
pub trait Command: Send + Sync + 'static {
    /// Stable type tag, e.g. `"channel.create"`.
    const COMMAND_TYPE: &'static str;

    fn id(&self) -> &RequestId;

    fn timestamp(&self) -> Timestamp;

    /// Checks the payload before any side effect.
    fn validate(&self) -> Result<(), CourierError>;
}

/// What a handler returns on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutcome {
    pub data: Option<Value>,
    /// Published in order after the handler returns.
    pub events: Vec<DomainEvent>,
}

impl CommandOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_event(mut self, event: DomainEvent) -> Self {
        self.events.push(event);
        self
    }
}

#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync + 'static {
    async fn handle(&self, ctx: &Context, command: &C) -> Result<CommandOutcome, CourierError>;
}

/// Routes each command to its single registered handler.
#[derive(Default)]
pub struct CommandBus {
    handlers: RwLock<HashMap<&'static str, Box<dyn Any + Send + Sync>>>,
    events: Option<Arc<EventBus>>,
}

impl std::fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBus")
            .field("handlers", &self.registered_types())
            .field("events", &self.events.is_some())
            .finish()
    }
}

impl CommandBus {
    /// A bus that does not publish events.
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus that publishes handler events on `events`.
    pub fn with_event_bus(events: Arc<EventBus>) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            events: Some(events),
        }
    }

    /// Registers the handler for `C`. The first registration wins.
    pub fn register<C: Command>(
        &self,
        handler: Arc<dyn CommandHandler<C>>,
    ) -> Result<(), CourierError> {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(C::COMMAND_TYPE) {
            return Err(CourierError::AlreadyRegistered {
                kind: "command handler".to_string(),
                name: C::COMMAND_TYPE.to_string(),
            });
        }
        handlers.insert(C::COMMAND_TYPE, Box::new(handler));
        debug!(command_type = C::COMMAND_TYPE, "registered command handler");
        Ok(())
    }

    /// Returns the handler registered for `C`.
    pub fn handler<C: Command>(&self) -> Option<Arc<dyn CommandHandler<C>>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(C::COMMAND_TYPE)
            .and_then(|h| h.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .cloned()
    }

    pub fn is_registered(&self, command_type: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(command_type)
    }

    /// Registered command types, sorted.
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        types.sort_unstable();
        types
    }

    /// Validates, routes and runs `command`.
    ///
    /// Never returns an error directly: failures are reported inside the
    /// [`CommandResult`]. Events are only published when the handler succeeds.
    pub async fn execute<C: Command>(&self, ctx: &Context, command: &C) -> CommandResult {
        let started = Instant::now();
        let executed_at = now_millis();
        let command_type = C::COMMAND_TYPE;
        debug!(command_type, command_id = %command.id(), "executing command");

        match self.dispatch(ctx, command).await {
            Ok(outcome) => {
                if let Some(bus) = &self.events {
                    if let Err(e) = bus.publish_batch(&outcome.events).await {
                        warn!(command_type, error = %e, "event publish failed");
                    }
                }
                let duration = started.elapsed();
                debug!(
                    command_type,
                    command_id = %command.id(),
                    duration_ms = duration.as_millis() as u64,
                    events = outcome.events.len(),
                    "command succeeded"
                );
                CommandResult::succeeded(
                    command.id().clone(),
                    command_type,
                    outcome.data,
                    outcome.events,
                    executed_at,
                    duration,
                )
            }
            Err(e) => {
                log_failure(command_type, command.id(), &e);
                CommandResult::failed(
                    command.id().clone(),
                    command_type,
                    &e,
                    executed_at,
                    started.elapsed(),
                )
            }
        }
    }

    async fn dispatch<C: Command>(
        &self,
        ctx: &Context,
        command: &C,
    ) -> Result<CommandOutcome, CourierError> {
        ctx.check()?;
        command.validate()?;
        let handler = self
            .handler::<C>()
            .ok_or_else(|| CourierError::HandlerNotFound {
                message_type: C::COMMAND_TYPE.to_string(),
            })?;
        handler.handle(ctx, command).await
    }
}

pub(crate) fn log_failure(message_type: &str, id: &RequestId, err: &CourierError) {
    match err.kind() {
        ErrorKind::Internal | ErrorKind::Storage | ErrorKind::Config => {
            error!(message_type, id = %id, error = %err, "request failed");
        }
        _ => {
            warn!(message_type, id = %id, kind = %err.kind(), error = %err, "request failed");
        }
    }
}
