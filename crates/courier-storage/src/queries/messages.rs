// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD and history paging.

use courier_core::{CourierError, HistoryQuery, Message, UserId};
use rusqlite::{params, params_from_iter, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::{message_from_row, MESSAGE_COLUMNS};

/// Insert a message and return the row id assigned by SQLite.
///
/// Fails on a duplicate `random_id` or a duplicate stream position.
pub async fn insert_message(db: &Database, message: &Message) -> Result<i64, CourierError> {
    let m = message.clone();
    let entities = m.entities.as_ref().map(|e| e.to_string());
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.execute(
                "INSERT INTO messages (stream_message_id, from_id, peer_id, peer_type, text, date,
                     random_id, reply_to_message_id, fwd_from_id, fwd_date, edit_date, media_id,
                     media_type, entities, is_out, is_mentioned, is_media_unread, is_silent,
                     is_pinned)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19)",
                params![
                    m.stream_message_id,
                    m.from_id.0,
                    m.peer_id,
                    m.peer_type.to_string(),
                    m.text,
                    m.date,
                    m.random_id,
                    m.reply_to_message_id,
                    m.fwd_from_id.map(|u| u.0),
                    m.fwd_date,
                    m.edit_date,
                    m.media.as_ref().map(|media| media.id.clone()),
                    m.media.as_ref().map(|media| media.media_type.clone()),
                    entities,
                    m.is_out,
                    m.is_mentioned,
                    m.is_media_unread,
                    m.is_silent,
                    m.is_pinned,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a message by its idempotency key.
pub async fn find_by_random_key(
    db: &Database,
    random_id: i64,
) -> Result<Option<Message>, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE random_id = ?1"),
                params![random_id],
                |row| message_from_row(row, None),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Load a message by row id.
pub async fn get_message(db: &Database, id: i64) -> Result<Option<Message>, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                |row| message_from_row(row, None),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Newest-first page of the conversation between `query.viewer` and `query.peer`.
///
/// Direct conversations merge both streams and page by row id; other peers
/// page by stream position. `is_out` is computed for the viewer.
pub async fn list_history(db: &Database, query: &HistoryQuery) -> Result<Vec<Message>, CourierError> {
    let q = *query;
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            let peer_type = q.peer.peer_type.to_string();
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE (CASE WHEN ?1 THEN
                          (from_id = ?2 AND peer_id = ?3 AND peer_type = 'user')
                          OR (from_id = ?3 AND peer_id = ?2 AND peer_type = 'user')
                        ELSE peer_id = ?3 AND peer_type = ?4 END)
                   AND (?5 IS NULL OR (CASE WHEN ?1 THEN id ELSE stream_message_id END) < ?5)
                 ORDER BY (CASE WHEN ?1 THEN id ELSE stream_message_id END) DESC
                 LIMIT ?6"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![
                    q.peer.is_direct(),
                    q.viewer.0,
                    q.peer.id,
                    peer_type,
                    q.offset_message_id,
                    q.limit,
                ],
                |row| message_from_row(row, Some(q.viewer)),
            )?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete the listed messages authored by `user` in one transaction.
///
/// Ids of missing messages or messages by other authors are ignored.
pub async fn delete_owned(
    db: &Database,
    user: UserId,
    ids: &[i64],
) -> Result<Vec<Message>, CourierError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            let tx = conn.transaction()?;
            let placeholders = vec!["?"; ids.len()].join(", ");
            let mut bound: Vec<i64> = Vec::with_capacity(ids.len() + 1);
            bound.push(user.0);
            bound.extend(&ids);

            let removed = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE from_id = ? AND id IN ({placeholders}) ORDER BY id"
                ))?;
                let rows = stmt.query_map(params_from_iter(bound.iter()), |row| {
                    message_from_row(row, Some(user))
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            tx.execute(
                &format!("DELETE FROM messages WHERE from_id = ? AND id IN ({placeholders})"),
                params_from_iter(bound.iter()),
            )?;
            tx.commit()?;
            Ok(removed)
        })
        .await
        .map_err(map_tr_err)
}

/// Replace text and entities of a message authored by `user`.
pub async fn update_text(
    db: &Database,
    user: UserId,
    id: i64,
    text: &str,
    entities: Option<serde_json::Value>,
    edit_date: i64,
) -> Result<Option<Message>, CourierError> {
    let text = text.to_string();
    let entities = entities.map(|e| e.to_string());
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            let changed = conn.execute(
                "UPDATE messages SET text = ?1, entities = ?2, edit_date = ?3
                 WHERE id = ?4 AND from_id = ?5",
                params![text, entities, edit_date, id, user.0],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                |row| message_from_row(row, Some(user)),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
