// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-stream message counters and per-user update sequences.
//!
//! Both are single-statement increment-and-fetch operations, so they are
//! atomic on the single writer connection.

use courier_core::{CourierError, Peer, UserId};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

/// Allocate the next `stream_message_id` of `peer`'s stream, starting at 1.
pub async fn next_stream_id(db: &Database, peer: Peer) -> Result<i64, CourierError> {
    let peer_type = peer.peer_type.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.query_row(
                "INSERT INTO stream_counters (peer_id, peer_type, last_id) VALUES (?1, ?2, 1)
                 ON CONFLICT (peer_id, peer_type) DO UPDATE SET last_id = last_id + 1
                 RETURNING last_id",
                params![peer.id, peer_type],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Roll the counter back by one if `id` is still the latest allocation.
pub async fn release_stream_id(db: &Database, peer: Peer, id: i64) -> Result<(), CourierError> {
    let peer_type = peer.peer_type.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.execute(
                "UPDATE stream_counters SET last_id = last_id - 1
                 WHERE peer_id = ?1 AND peer_type = ?2 AND last_id = ?3",
                params![peer.id, peer_type, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Bump a user's pts and return the new value.
pub async fn increment_pts(db: &Database, user: UserId) -> Result<i64, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.query_row(
                "INSERT INTO user_state (user_id, pts) VALUES (?1, 1)
                 ON CONFLICT (user_id) DO UPDATE SET pts = pts + 1
                 RETURNING pts",
                params![user.0],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
