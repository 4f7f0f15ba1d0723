// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel CRUD operations.

use courier_core::{Channel, ChannelId, CourierError, now_millis};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err, map_write_err};

/// Insert or replace a channel row.
pub async fn upsert_channel(db: &Database, channel: &Channel) -> Result<(), CourierError> {
    let data = serde_json::to_string(channel).map_err(CourierError::storage)?;
    let id = channel.id.to_string();
    let name = channel.name.clone();
    let channel_type = channel.channel_type.clone();
    let template_id = channel.template_id.as_ref().map(ToString::to_string);
    let enabled = channel.enabled;
    let created_at = channel.created_at;
    let updated_at = channel.updated_at;
    let deleted_at = channel.deleted_at;

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO channels (id, name, channel_type, template_id, enabled, data, \
                 created_at, updated_at, deleted_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    channel_type = excluded.channel_type,
                    template_id = excluded.template_id,
                    enabled = excluded.enabled,
                    data = excluded.data,
                    updated_at = excluded.updated_at,
                    deleted_at = excluded.deleted_at",
                params![
                    id,
                    name,
                    channel_type,
                    template_id,
                    enabled,
                    data,
                    created_at,
                    updated_at,
                    deleted_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_write_err("channel"))
}

/// Get a live channel by id.
pub async fn get_channel(db: &Database, id: &ChannelId) -> Result<Option<Channel>, CourierError> {
    let id = id.to_string();
    let data: Option<String> = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT data FROM channels WHERE id = ?1 AND deleted_at IS NULL",
                params![id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    data.map(|d| serde_json::from_str(&d).map_err(CourierError::storage))
        .transpose()
}

/// Soft-delete a live channel. Returns false when no live row matched.
pub async fn soft_delete_channel(db: &Database, id: &ChannelId) -> Result<bool, CourierError> {
    let existing = get_channel(db, id).await?;
    let Some(mut channel) = existing else {
        return Ok(false);
    };
    channel.mark_deleted();
    let data = serde_json::to_string(&channel).map_err(CourierError::storage)?;
    let id = id.to_string();
    let deleted_at = channel.deleted_at.unwrap_or_else(now_millis);

    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE channels SET deleted_at = ?2, updated_at = ?2, data = ?3
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![id, deleted_at, data],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed > 0)
}

/// All live channels, oldest first.
pub async fn list_live_channels(db: &Database) -> Result<Vec<Channel>, CourierError> {
    let rows: Vec<String> = db
        .connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT data FROM channels WHERE deleted_at IS NULL
                 ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)?;

    rows.iter()
        .map(|d| serde_json::from_str(d).map_err(CourierError::storage))
        .collect()
}
