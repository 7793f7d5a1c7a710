// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite columns and the domain types in `courier-core`.

use std::str::FromStr;

use courier_core::types::{CallInfo, CallState, Dialog, MediaRef, Message, PeerType, UserId};
use courier_core::CallId;
use rusqlite::types::Type;
use rusqlite::Row;

/// Column list matching [`message_from_row`].
pub(crate) const MESSAGE_COLUMNS: &str = "id, stream_message_id, from_id, peer_id, peer_type, \
     text, date, random_id, reply_to_message_id, fwd_from_id, fwd_date, edit_date, media_id, \
     media_type, entities, is_out, is_mentioned, is_media_unread, is_silent, is_pinned";

/// Column list matching [`dialog_from_row`].
pub(crate) const DIALOG_COLUMNS: &str = "owner_id, peer_id, peer_type, top_message_id, \
     read_inbox_max_id, read_outbox_max_id, unread_count, unread_mentions_count, \
     unread_reactions_count, pts, draft, folder_id, is_pinned, pinned_order, mute_until, \
     notify_silent, updated_at";

fn parse_enum<T: FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Map a row selected with [`MESSAGE_COLUMNS`].
///
/// With a `viewer`, `is_out` is derived from authorship instead of the stored flag.
pub(crate) fn message_from_row(row: &Row<'_>, viewer: Option<UserId>) -> rusqlite::Result<Message> {
    let from_id = UserId(row.get(2)?);
    let media_id: Option<String> = row.get(12)?;
    let media_type: Option<String> = row.get(13)?;
    let media = match (media_id, media_type) {
        (Some(id), Some(media_type)) => Some(MediaRef { id, media_type }),
        _ => None,
    };
    let entities: Option<String> = row.get(14)?;
    let entities = entities
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(14, Type::Text, Box::new(e)))?;
    let stored_out: bool = row.get(15)?;

    Ok(Message {
        id: row.get(0)?,
        stream_message_id: row.get(1)?,
        from_id,
        peer_id: row.get(3)?,
        peer_type: parse_enum::<PeerType>(row, 4)?,
        text: row.get(5)?,
        date: row.get(6)?,
        random_id: row.get(7)?,
        reply_to_message_id: row.get(8)?,
        fwd_from_id: row.get::<_, Option<i64>>(9)?.map(UserId),
        fwd_date: row.get(10)?,
        edit_date: row.get(11)?,
        media,
        entities,
        is_out: viewer.map_or(stored_out, |v| v == from_id),
        is_mentioned: row.get(16)?,
        is_media_unread: row.get(17)?,
        is_silent: row.get(18)?,
        is_pinned: row.get(19)?,
    })
}

/// Map a row selected with [`DIALOG_COLUMNS`].
pub(crate) fn dialog_from_row(row: &Row<'_>) -> rusqlite::Result<Dialog> {
    Ok(Dialog {
        owner_id: UserId(row.get(0)?),
        peer_id: row.get(1)?,
        peer_type: parse_enum::<PeerType>(row, 2)?,
        top_message_id: row.get(3)?,
        read_inbox_max_id: row.get(4)?,
        read_outbox_max_id: row.get(5)?,
        unread_count: row.get(6)?,
        unread_mentions_count: row.get(7)?,
        unread_reactions_count: row.get(8)?,
        pts: row.get(9)?,
        draft: row.get(10)?,
        folder_id: row.get(11)?,
        is_pinned: row.get(12)?,
        pinned_order: row.get(13)?,
        mute_until: row.get(14)?,
        notify_silent: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

/// Map `id, caller_id, callee_id, state`.
pub(crate) fn call_from_row(row: &Row<'_>) -> rusqlite::Result<CallInfo> {
    Ok(CallInfo {
        call_id: CallId(row.get(0)?),
        caller_id: UserId(row.get(1)?),
        callee_id: UserId(row.get(2)?),
        state: parse_enum::<CallState>(row, 3)?,
    })
}
