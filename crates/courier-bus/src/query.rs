// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query bus: one handler per query type, no side effects.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use courier_core::{Context, CourierError, RequestId, Timestamp, now_millis};
use serde::Serialize;
use tracing::debug;

use crate::command::log_failure;
use crate::result::QueryResult;

/// A read-only request.
pub trait Query: Send + Sync + 'static {
    /// Stable type tag, e.g. `"channel.get"`.
    const QUERY_TYPE: &'static str;

    type Output: Serialize + Send + 'static;

    fn id(&self) -> &RequestId;

    fn timestamp(&self) -> Timestamp;

    fn validate(&self) -> Result<(), CourierError>;
}

#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync + 'static {
    async fn handle(&self, ctx: &Context, query: &Q) -> Result<Q::Output, CourierError>;
}

/// Routes each query to its single registered handler.
#[derive(Default)]
pub struct QueryBus {
    handlers: RwLock<HashMap<&'static str, Box<dyn Any + Send + Sync>>>,
}

impl std::fmt::Debug for QueryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBus")
            .field("handlers", &self.registered_types())
            .finish()
    }
}

impl QueryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `Q`. The first registration wins.
    pub fn register<Q: Query>(&self, handler: Arc<dyn QueryHandler<Q>>) -> Result<(), CourierError> {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(Q::QUERY_TYPE) {
            return Err(CourierError::AlreadyRegistered {
                kind: "query handler".to_string(),
                name: Q::QUERY_TYPE.to_string(),
            });
        }
        handlers.insert(Q::QUERY_TYPE, Box::new(handler));
        debug!(query_type = Q::QUERY_TYPE, "registered query handler");
        Ok(())
    }

    pub fn handler<Q: Query>(&self) -> Option<Arc<dyn QueryHandler<Q>>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(Q::QUERY_TYPE)
            .and_then(|h| h.downcast_ref::<Arc<dyn QueryHandler<Q>>>())
            .cloned()
    }

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

    /// Runs the query and returns its typed output.
    pub async fn ask<Q: Query>(&self, ctx: &Context, query: &Q) -> Result<Q::Output, CourierError> {
        ctx.check()?;
        query.validate()?;
        let handler = self
            .handler::<Q>()
            .ok_or_else(|| CourierError::HandlerNotFound {
                message_type: Q::QUERY_TYPE.to_string(),
            })?;
        handler.handle(ctx, query).await
    }

    /// Runs the query and wraps the serialized output in a [`QueryResult`].
    pub async fn execute<Q: Query>(&self, ctx: &Context, query: &Q) -> QueryResult {
        let started = Instant::now();
        let executed_at = now_millis();
        let query_type = Q::QUERY_TYPE;
        debug!(query_type, query_id = %query.id(), "executing query");

        let outcome = self.ask(ctx, query).await.and_then(|output| {
            serde_json::to_value(output)
                .map_err(|e| CourierError::Internal(format!("serialize query output: {e}")))
        });

        match outcome {
            Ok(data) => QueryResult::succeeded(
                query.id().clone(),
                query_type,
                data,
                executed_at,
                started.elapsed(),
            ),
            Err(e) => {
                log_failure(query_type, query.id(), &e);
                QueryResult::failed(query.id().clone(), query_type, &e, executed_at, started.elapsed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::ErrorKind;

    struct Echo {
        id: RequestId,
        text: String,
    }

    impl Query for Echo {
        const QUERY_TYPE: &'static str = "test.echo";
        type Output = String;

        fn id(&self) -> &RequestId {
            &self.id
        }

        fn timestamp(&self) -> Timestamp {
            0
        }

        fn validate(&self) -> Result<(), CourierError> {
            if self.text.len() > 10 {
                return Err(CourierError::validation("text", "too long"));
            }
            Ok(())
        }
    }

    struct Upper;

    #[async_trait]
    impl QueryHandler<Echo> for Upper {
        async fn handle(&self, _ctx: &Context, query: &Echo) -> Result<String, CourierError> {
            Ok(query.text.to_uppercase())
        }
    }

    fn echo(text: &str) -> Echo {
        Echo {
            id: RequestId::new(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn execute_serializes_output() {
        let bus = QueryBus::new();
        bus.register::<Echo>(Arc::new(Upper)).unwrap();
        let result = bus.execute(&Context::new(), &echo("hi")).await;
        assert!(result.success);
        assert!(!result.cache_hit);
        assert_eq!(result.data, Some(serde_json::json!("HI")));
        assert_eq!(result.query_type, "test.echo");
    }

    #[tokio::test]
    async fn ask_returns_typed_output() {
        let bus = QueryBus::new();
        bus.register::<Echo>(Arc::new(Upper)).unwrap();
        assert_eq!(bus.ask(&Context::new(), &echo("a")).await.unwrap(), "A");
    }

    #[tokio::test]
    async fn invalid_query_and_missing_handler() {
        let bus = QueryBus::new();
        let result = bus.execute(&Context::new(), &echo("x")).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::HandlerNotFound));

        bus.register::<Echo>(Arc::new(Upper)).unwrap();
        let result = bus.execute(&Context::new(), &echo("far too long text")).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let bus = QueryBus::new();
        bus.register::<Echo>(Arc::new(Upper)).unwrap();
        assert!(bus.register::<Echo>(Arc::new(Upper)).is_err());
        assert_eq!(bus.registered_types(), ["test.echo"]);
    }
}
