// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call records backing the signaling relay's participant lookup.

use courier_core::{CallId, CallInfo, CallState, CourierError, UserId};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::call_from_row;

/// Record a new call between two users in the `requested` state.
pub async fn create_call(
    db: &Database,
    caller: UserId,
    callee: UserId,
    created_at: i64,
) -> Result<CallInfo, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.execute(
                "INSERT INTO calls (caller_id, callee_id, state, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![caller.0, callee.0, CallState::Requested.to_string(), created_at],
            )?;
            Ok(CallInfo {
                call_id: CallId(conn.last_insert_rowid()),
                caller_id: caller,
                callee_id: callee,
                state: CallState::Requested,
            })
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_call(db: &Database, call_id: CallId) -> Result<Option<CallInfo>, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.query_row(
                "SELECT id, caller_id, callee_id, state FROM calls WHERE id = ?1",
                params![call_id.0],
                call_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Returns `false` when the call does not exist.
pub async fn set_call_state(
    db: &Database,
    call_id: CallId,
    state: CallState,
) -> Result<bool, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            let changed = conn.execute(
                "UPDATE calls SET state = ?2 WHERE id = ?1",
                params![call_id.0, state.to_string()],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
