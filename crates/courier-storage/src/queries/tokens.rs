// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opaque access tokens resolved by the live channel upgrade.

use courier_core::{CourierError, UserId, UserIdentity};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

/// Store `token` for `user`. Re-issuing an existing token rebinds it.
pub async fn issue_token(
    db: &Database,
    token: &str,
    user: UserId,
    created_at: i64,
    expires_at: Option<i64>,
) -> Result<(), CourierError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.execute(
                "INSERT INTO auth_tokens (token, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (token) DO UPDATE SET
                     user_id = excluded.user_id,
                     created_at = excluded.created_at,
                     expires_at = excluded.expires_at",
                params![token, user.0, created_at, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve an unexpired token as of `now`.
pub async fn resolve_token(
    db: &Database,
    token: &str,
    now: i64,
) -> Result<Option<UserIdentity>, CourierError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.query_row(
                "SELECT user_id FROM auth_tokens
                 WHERE token = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![token, now],
                |row| {
                    Ok(UserIdentity {
                        user_id: UserId(row.get(0)?),
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn revoke_token(db: &Database, token: &str) -> Result<bool, CourierError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            let changed = conn.execute("DELETE FROM auth_tokens WHERE token = ?1", params![token])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
