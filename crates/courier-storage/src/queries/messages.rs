// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message aggregate persistence.
//!
//! The message row holds the aggregate without its results; each result is
//! its own `message_results` row keyed by `(message_id, channel_id)` and
//! ordered by `position`.

use courier_core::{CourierError, Message, MessageId, MessageResult};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

struct ResultRow {
    channel_id: String,
    status: String,
    error_code: Option<String>,
    data: String,
    sent_at: Option<i64>,
}

/// Upsert a message and replace its results in one transaction.
pub async fn save_message(db: &Database, message: &Message) -> Result<(), CourierError> {
    let mut shell = message.clone();
    shell.results.clear();
    let data = serde_json::to_string(&shell).map_err(CourierError::storage)?;
    let results = message
        .results
        .iter()
        .map(|r| {
            Ok(ResultRow {
                channel_id: r.channel_id.to_string(),
                status: r.status.to_string(),
                error_code: r.error_code.map(|c| c.to_string()),
                data: serde_json::to_string(r).map_err(CourierError::storage)?,
                sent_at: r.sent_at,
            })
        })
        .collect::<Result<Vec<_>, CourierError>>()?;

    let id = message.id.to_string();
    let template_id = message.template_id.to_string();
    let status = message.status.to_string();
    let created_at = message.created_at;
    let updated_at = message.updated_at;

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, template_id, status, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    status = excluded.status,
                    data = excluded.data,
                    updated_at = excluded.updated_at",
                params![id, template_id, status, data, created_at, updated_at],
            )?;
            tx.execute(
                "DELETE FROM message_results WHERE message_id = ?1",
                params![id],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO message_results
                        (message_id, channel_id, position, status, error_code, data, sent_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for (position, row) in results.iter().enumerate() {
                    stmt.execute(params![
                        id,
                        row.channel_id,
                        position as i64,
                        row.status,
                        row.error_code,
                        row.data,
                        row.sent_at,
                    ])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

fn decode(data: &str, results: &[String]) -> Result<Message, CourierError> {
    let mut message: Message = serde_json::from_str(data).map_err(CourierError::storage)?;
    message.results = results
        .iter()
        .map(|r| serde_json::from_str::<MessageResult>(r).map_err(CourierError::storage))
        .collect::<Result<_, _>>()?;
    Ok(message)
}

/// Get a message with its results.
pub async fn get_message(db: &Database, id: &MessageId) -> Result<Option<Message>, CourierError> {
    let id = id.to_string();
    let row: Option<(String, Vec<String>)> = db
        .connection()
        .call(move |conn| {
            let data: Option<String> = conn
                .query_row(
                    "SELECT data FROM messages WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(data) = data else {
                return Ok(None);
            };
            let mut stmt = conn.prepare(
                "SELECT data FROM message_results WHERE message_id = ?1 ORDER BY position ASC",
            )?;
            let results = stmt
                .query_map(params![id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(Some((data, results)))
        })
        .await
        .map_err(map_tr_err)?;

    row.map(|(data, results)| decode(&data, &results)).transpose()
}

/// All messages with their results, oldest first.
pub async fn list_messages(db: &Database) -> Result<Vec<Message>, CourierError> {
    let rows: Vec<(String, Vec<String>)> = db
        .connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, data FROM messages ORDER BY created_at ASC, id ASC")?;
            let messages = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;

            let mut results_stmt = conn.prepare(
                "SELECT data FROM message_results WHERE message_id = ?1 ORDER BY position ASC",
            )?;
            let mut out = Vec::with_capacity(messages.len());
            for (id, data) in messages {
                let results = results_stmt
                    .query_map(params![id], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                out.push((data, results));
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)?;

    rows.iter()
        .map(|(data, results)| decode(data, results))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{ChannelId, MessageStatus, SenderError, TemplateId};
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    fn two_channel_message() -> Message {
        let ids = [ChannelId::from("c1"), ChannelId::from("c2")];
        Message::new(&ids, TemplateId::from("t1")).unwrap()
    }

    #[tokio::test]
    async fn pending_then_final_save() {
        let (db, _dir) = setup().await;
        let mut msg = two_channel_message();
        save_message(&db, &msg).await.unwrap();

        let loaded = get_message(&db, &msg.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MessageStatus::Pending);
        assert!(loaded.results.is_empty());

        msg.record_result(MessageResult::success(ChannelId::from("c2"), "sent", 10, 1))
            .unwrap();
        msg.record_result(MessageResult::failed(
            ChannelId::from("c1"),
            &SenderError::auth("bad key"),
            1,
        ))
        .unwrap();
        msg.finalize();
        save_message(&db, &msg).await.unwrap();

        let loaded = get_message(&db, &msg.id).await.unwrap().unwrap();
        assert_eq!(loaded, msg);
        assert_eq!(loaded.results[0].channel_id, ChannelId::from("c2"));
        assert_eq!(loaded.status, MessageStatus::PartialSuccess);
    }

    #[tokio::test]
    async fn missing_message_is_none() {
        let (db, _dir) = setup().await;
        assert!(get_message(&db, &MessageId::from("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_returns_all_messages() {
        let (db, _dir) = setup().await;
        save_message(&db, &two_channel_message()).await.unwrap();
        save_message(&db, &two_channel_message()).await.unwrap();
        assert_eq!(list_messages(&db).await.unwrap().len(), 2);
    }
}
