// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template CRUD operations.

use courier_core::{CourierError, Template, TemplateId, now_millis};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err, map_write_err};

/// Insert or replace a template row.
pub async fn upsert_template(db: &Database, template: &Template) -> Result<(), CourierError> {
    let data = serde_json::to_string(template).map_err(CourierError::storage)?;
    let id = template.id.to_string();
    let name = template.name.clone();
    let channel_type = template.channel_type.clone();
    let version = template.version;
    let created_at = template.created_at;
    let updated_at = template.updated_at;
    let deleted_at = template.deleted_at;

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO templates (id, name, channel_type, version, data, created_at, \
                 updated_at, deleted_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    channel_type = excluded.channel_type,
                    version = excluded.version,
                    data = excluded.data,
                    updated_at = excluded.updated_at,
                    deleted_at = excluded.deleted_at",
                params![
                    id,
                    name,
                    channel_type,
                    version,
                    data,
                    created_at,
                    updated_at,
                    deleted_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_write_err("template"))
}

/// Get a live template by id.
pub async fn get_template(
    db: &Database,
    id: &TemplateId,
) -> Result<Option<Template>, CourierError> {
    let id = id.to_string();
    let data: Option<String> = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT data FROM templates WHERE id = ?1 AND deleted_at IS NULL",
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

/// Soft-delete a live template. Returns false when no live row matched.
pub async fn soft_delete_template(db: &Database, id: &TemplateId) -> Result<bool, CourierError> {
    let Some(mut template) = get_template(db, id).await? else {
        return Ok(false);
    };
    template.mark_deleted();
    let data = serde_json::to_string(&template).map_err(CourierError::storage)?;
    let id = id.to_string();
    let deleted_at = template.deleted_at.unwrap_or_else(now_millis);

    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE templates SET deleted_at = ?2, updated_at = ?2, data = ?3
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![id, deleted_at, data],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed > 0)
}

/// All live templates, oldest first.
pub async fn list_live_templates(db: &Database) -> Result<Vec<Template>, CourierError> {
    let rows: Vec<String> = db
        .connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT data FROM templates WHERE deleted_at IS NULL
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
