// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers for the REST API.
//!
//! Every route builds a command or query, runs it through the service and
//! returns the bus result verbatim. The status code is derived from the
//! result's wire error code.

use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_bus::{BusError, Command, CommandResult, QueryResult};
use courier_core::{
    ChannelId, ChannelPatch, CourierError, ErrorCode, Filter, ListQuery, MessageId, SortOrder,
    TemplateId, TemplatePatch,
};
use courier_registry::catalog;
use courier_service::{
    CreateChannelCommand, CreateTemplateCommand, DeleteChannelCommand, DeleteTemplateCommand,
    GetChannelQuery, GetMessageQuery, GetTemplateQuery, ListChannelsQuery, ListMessagesQuery,
    ListTemplatesQuery, SendMessageCommand, UpdateChannelCommand, UpdateTemplateCommand,
};
use serde::Serialize;
use serde_json::Value;

use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub channel_types: Vec<String>,
}

/// Maps a wire error code onto an HTTP status.
pub fn status_for(error: Option<&BusError>) -> StatusCode {
    error.map_or(StatusCode::OK, |e| status_for_code(e.code))
}

fn status_for_code(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ExecutionError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn command_response(result: CommandResult, ok: StatusCode) -> Response {
    let status = if result.success {
        ok
    } else {
        status_for(result.error.as_ref())
    };
    (status, Json(result)).into_response()
}

fn query_response(result: QueryResult) -> Response {
    (status_for(result.error.as_ref()), Json(result)).into_response()
}

/// Body for requests that never reached a bus.
fn error_response(err: &CourierError) -> Response {
    let error = BusError::from(err);
    (status_for(Some(&error)), Json(serde_json::json!({ "success": false, "error": error })))
        .into_response()
}

fn rejection(rejection: JsonRejection) -> Response {
    error_response(&CourierError::validation("body", rejection.body_text()))
}

async fn run<C: Command>(state: &GatewayState, command: C, ok: StatusCode) -> Response {
    command_response(state.service.execute(&state.context(), &command).await, ok)
}

/// Builds a list query from `?limit=&offset=&sortBy=&sortOrder=` plus
/// equality filters for every other parameter.
///
/// Filter values are read as JSON when they parse (numbers, booleans) and
/// as plain strings otherwise.
pub fn list_query(params: HashMap<String, String>) -> Result<ListQuery, CourierError> {
    let mut query = ListQuery::new();
    let mut sort_by = None;
    let mut sort_order = SortOrder::Asc;
    let mut keys: Vec<_> = params.into_iter().collect();
    keys.sort();

    for (key, value) in keys {
        match key.as_str() {
            "limit" => {
                query.pagination.limit = value
                    .parse()
                    .map_err(|_| CourierError::validation("limit", "must be an integer"))?;
            }
            "offset" => {
                query.pagination.offset = value
                    .parse()
                    .map_err(|_| CourierError::validation("offset", "must be an integer"))?;
            }
            "sortBy" => sort_by = Some(value),
            "sortOrder" => {
                sort_order = SortOrder::from_str(&value.to_ascii_lowercase())
                    .map_err(|_| CourierError::validation("sortOrder", "must be asc or desc"))?;
            }
            _ => {
                let parsed = serde_json::from_str(&value).unwrap_or(Value::String(value));
                query = query.filter(Filter::eq(key, parsed));
            }
        }
    }
    if let Some(field) = sort_by {
        query = query.sort_by(field, sort_order);
    }
    Ok(query)
}

// Channels

pub async fn create_channel(
    State(state): State<GatewayState>,
    body: Result<Json<CreateChannelCommand>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(command)) => run(&state, command, StatusCode::CREATED).await,
        Err(r) => rejection(r),
    }
}

pub async fn list_channels(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match list_query(params) {
        Ok(q) => query_response(
            state
                .service
                .query(&state.context(), &ListChannelsQuery::new(q))
                .await,
        ),
        Err(e) => error_response(&e),
    }
}

pub async fn get_channel(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    let query = GetChannelQuery::new(ChannelId::from(id));
    query_response(state.service.query(&state.context(), &query).await)
}

pub async fn update_channel(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: Result<Json<ChannelPatch>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(patch)) => {
            let command = UpdateChannelCommand::new(ChannelId::from(id), patch);
            run(&state, command, StatusCode::OK).await
        }
        Err(r) => rejection(r),
    }
}

pub async fn delete_channel(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    run(&state, DeleteChannelCommand::new(ChannelId::from(id)), StatusCode::OK).await
}

// Templates

pub async fn create_template(
    State(state): State<GatewayState>,
    body: Result<Json<CreateTemplateCommand>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(command)) => run(&state, command, StatusCode::CREATED).await,
        Err(r) => rejection(r),
    }
}

pub async fn list_templates(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match list_query(params) {
        Ok(q) => query_response(
            state
                .service
                .query(&state.context(), &ListTemplatesQuery::new(q))
                .await,
        ),
        Err(e) => error_response(&e),
    }
}

pub async fn get_template(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    let query = GetTemplateQuery::new(TemplateId::from(id));
    query_response(state.service.query(&state.context(), &query).await)
}

pub async fn update_template(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: Result<Json<TemplatePatch>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(patch)) => {
            let command = UpdateTemplateCommand::new(TemplateId::from(id), patch);
            run(&state, command, StatusCode::OK).await
        }
        Err(r) => rejection(r),
    }
}

pub async fn delete_template(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    run(&state, DeleteTemplateCommand::new(TemplateId::from(id)), StatusCode::OK).await
}

// Messages

pub async fn send_message(
    State(state): State<GatewayState>,
    body: Result<Json<SendMessageCommand>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(command)) => run(&state, command, StatusCode::CREATED).await,
        Err(r) => rejection(r),
    }
}

pub async fn list_messages(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match list_query(params) {
        Ok(q) => query_response(
            state
                .service
                .query(&state.context(), &ListMessagesQuery::new(q))
                .await,
        ),
        Err(e) => error_response(&e),
    }
}

pub async fn get_message(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    let query = GetMessageQuery::new(MessageId::from(id));
    query_response(state.service.query(&state.context(), &query).await)
}

// Catalog, health and broker bridge

pub async fn list_channel_types(State(state): State<GatewayState>) -> Response {
    Json(catalog(state.service.registry())).into_response()
}

pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        channel_types: state.service.registry().names(),
    })
}

/// POST /v1/rpc/{subject}: broker-style request/reply over HTTP.
pub async fn rpc(
    State(state): State<GatewayState>,
    Path(subject): Path<String>,
    body: Result<Json<RequestEnvelope>, JsonRejection>,
) -> Response {
    let envelope = match body {
        Ok(Json(request)) => state.broker.handle(&state.context(), &subject, request).await,
        Err(r) => {
            ResponseEnvelope::from_error("", &CourierError::validation("body", r.body_text()))
        }
    };
    let status = envelope
        .error
        .as_ref()
        .map_or(StatusCode::OK, |e| status_for_code(e.code));
    (status, Json(envelope)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::FilterOperator;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn list_query_reads_paging_sort_and_filters() {
        let q = list_query(params(&[
            ("limit", "5"),
            ("offset", "10"),
            ("sortBy", "name"),
            ("sortOrder", "DESC"),
            ("channelType", "email"),
            ("enabled", "true"),
        ]))
        .unwrap();
        assert_eq!(q.pagination.limit, 5);
        assert_eq!(q.pagination.offset, 10);
        let sort = q.sort.unwrap();
        assert_eq!((sort.field.as_str(), sort.order), ("name", SortOrder::Desc));
        assert_eq!(q.filters.len(), 2);
        assert!(q.filters.iter().all(|f| f.op == FilterOperator::Eq));
        assert!(q.filters.iter().any(|f| f.value == Value::Bool(true)));
        assert!(q.filters.iter().any(|f| f.value == Value::String("email".into())));
    }

    #[test]
    fn bad_paging_is_validation() {
        assert!(list_query(params(&[("limit", "many")])).is_err());
        assert!(list_query(params(&[("sortOrder", "sideways")])).is_err());
    }

    #[test]
    fn status_mapping() {
        let err = |e: CourierError| status_for(Some(&BusError::from(&e)));
        assert_eq!(err(CourierError::validation("f", "r")), StatusCode::BAD_REQUEST);
        assert_eq!(err(CourierError::not_found("channel", "x")), StatusCode::NOT_FOUND);
        assert_eq!(err(CourierError::conflict("template", "used")), StatusCode::CONFLICT);
        assert_eq!(err(CourierError::Canceled), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(None), StatusCode::OK);
    }
}
