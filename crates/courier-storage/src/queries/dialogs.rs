// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialog rows: one per (owner, peer) pair.

use courier_core::{CourierError, Dialog, DialogPrefs, DialogQuery, DialogTouch, Peer, UserId};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::{dialog_from_row, DIALOG_COLUMNS};

/// Create the dialog if absent, otherwise move its top message forward.
///
/// Neither the top message nor `updated_at` ever moves backwards, whatever
/// order concurrent touches land in.
pub async fn upsert_dialog(db: &Database, touch: &DialogTouch) -> Result<(), CourierError> {
    let t = *touch;
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.execute(
                "INSERT INTO dialogs (owner_id, peer_id, peer_type, top_message_id, pts, updated_at)
                 VALUES (?1, ?2, ?3, ?4, COALESCE(?5, 0), ?6)
                 ON CONFLICT (owner_id, peer_id, peer_type) DO UPDATE SET
                     top_message_id = MAX(dialogs.top_message_id, excluded.top_message_id),
                     updated_at = MAX(dialogs.updated_at, excluded.updated_at),
                     pts = COALESCE(?5, dialogs.pts)",
                params![
                    t.owner_id.0,
                    t.peer.id,
                    t.peer.peer_type.to_string(),
                    t.top_message_id,
                    t.pts,
                    t.date,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count one more unread message (and mention) on an existing dialog.
///
/// A dialog whose read pointer already covers its top message stays at zero.
pub async fn increment_unread(
    db: &Database,
    owner: UserId,
    peer: Peer,
    mentioned: bool,
) -> Result<(), CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.execute(
                "UPDATE dialogs SET
                     unread_count = CASE WHEN read_inbox_max_id >= top_message_id
                                         THEN 0 ELSE unread_count + 1 END,
                     unread_mentions_count = CASE WHEN read_inbox_max_id >= top_message_id
                                                  THEN 0 ELSE unread_mentions_count + ?4 END
                 WHERE owner_id = ?1 AND peer_id = ?2 AND peer_type = ?3",
                params![owner.0, peer.id, peer.peer_type.to_string(), i64::from(mentioned)],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_dialog(
    db: &Database,
    owner: UserId,
    peer: Peer,
) -> Result<Option<Dialog>, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            conn.query_row(
                &format!(
                    "SELECT {DIALOG_COLUMNS} FROM dialogs
                     WHERE owner_id = ?1 AND peer_id = ?2 AND peer_type = ?3"
                ),
                params![owner.0, peer.id, peer.peer_type.to_string()],
                dialog_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Pinned dialogs first (most recently pinned on top), then by last update.
pub async fn list_dialogs(db: &Database, query: &DialogQuery) -> Result<Vec<Dialog>, CourierError> {
    let q = *query;
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DIALOG_COLUMNS} FROM dialogs
                 WHERE owner_id = ?1 AND (?2 IS NULL OR updated_at < ?2)
                 ORDER BY is_pinned DESC, pinned_order DESC, updated_at DESC
                 LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![q.owner_id.0, q.offset_date, q.limit], dialog_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Move the inbox pointer forward and clear unread counters.
pub async fn advance_read_pointer(
    db: &Database,
    owner: UserId,
    peer: Peer,
    max_id: i64,
) -> Result<bool, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            let changed = conn.execute(
                "UPDATE dialogs SET read_inbox_max_id = ?4, unread_count = 0,
                     unread_mentions_count = 0
                 WHERE owner_id = ?1 AND peer_id = ?2 AND peer_type = ?3
                   AND read_inbox_max_id < ?4",
                params![owner.0, peer.id, peer.peer_type.to_string(), max_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Move the outbox pointer forward.
pub async fn advance_outbox_pointer(
    db: &Database,
    owner: UserId,
    peer: Peer,
    max_id: i64,
) -> Result<bool, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            let changed = conn.execute(
                "UPDATE dialogs SET read_outbox_max_id = ?4
                 WHERE owner_id = ?1 AND peer_id = ?2 AND peer_type = ?3
                   AND read_outbox_max_id < ?4",
                params![owner.0, peer.id, peer.peer_type.to_string(), max_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a partial preferences update. Returns `None` if the dialog does not exist.
///
/// Pinning assigns the next `pinned_order` for the owner; unpinning clears it.
/// An empty draft clears the stored draft.
pub async fn update_dialog_prefs(
    db: &Database,
    owner: UserId,
    peer: Peer,
    prefs: &DialogPrefs,
) -> Result<Option<Dialog>, CourierError> {
    let prefs = prefs.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<_> {
            let peer_type = peer.peer_type.to_string();
            let tx = conn.transaction()?;
            let select = format!(
                "SELECT {DIALOG_COLUMNS} FROM dialogs
                 WHERE owner_id = ?1 AND peer_id = ?2 AND peer_type = ?3"
            );
            let Some(current) = tx
                .query_row(&select, params![owner.0, peer.id, peer_type], dialog_from_row)
                .optional()?
            else {
                return Ok(None);
            };

            match prefs.pinned {
                Some(true) if !current.is_pinned => {
                    tx.execute(
                        "UPDATE dialogs SET is_pinned = 1,
                             pinned_order = (SELECT COALESCE(MAX(pinned_order), 0) + 1
                                             FROM dialogs WHERE owner_id = ?1)
                         WHERE owner_id = ?1 AND peer_id = ?2 AND peer_type = ?3",
                        params![owner.0, peer.id, peer_type],
                    )?;
                }
                Some(false) => {
                    tx.execute(
                        "UPDATE dialogs SET is_pinned = 0, pinned_order = NULL
                         WHERE owner_id = ?1 AND peer_id = ?2 AND peer_type = ?3",
                        params![owner.0, peer.id, peer_type],
                    )?;
                }
                _ => {}
            }

            tx.execute(
                "UPDATE dialogs SET
                     draft = CASE WHEN ?4 IS NULL THEN draft WHEN ?4 = '' THEN NULL ELSE ?4 END,
                     mute_until = COALESCE(?5, mute_until),
                     notify_silent = COALESCE(?6, notify_silent),
                     folder_id = COALESCE(?7, folder_id)
                 WHERE owner_id = ?1 AND peer_id = ?2 AND peer_type = ?3",
                params![
                    owner.0,
                    peer.id,
                    peer_type,
                    prefs.draft,
                    prefs.mute_until,
                    prefs.notify_silent,
                    prefs.folder_id,
                ],
            )?;

            let updated = tx
                .query_row(&select, params![owner.0, peer.id, peer_type], dialog_from_row)
                .optional()?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use courier_core::PeerType;

    use super::*;
    use crate::queries::test_support::open_test_db;

    fn touch(owner: i64, peer: Peer, top: i64, date: i64) -> DialogTouch {
        DialogTouch {
            owner_id: UserId(owner),
            peer,
            top_message_id: top,
            date,
            pts: None,
        }
    }

    fn list(owner: i64) -> DialogQuery {
        DialogQuery {
            owner_id: UserId(owner),
            offset_date: None,
            limit: 50,
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_advances() {
        let (_dir, db) = open_test_db().await;
        let peer = Peer::user(UserId(2));
        upsert_dialog(&db, &touch(1, peer, 1, 100)).await.unwrap();
        upsert_dialog(&db, &DialogTouch { pts: Some(4), ..touch(1, peer, 2, 101) })
            .await
            .unwrap();
        // Stale touch keeps the newer top message.
        upsert_dialog(&db, &touch(1, peer, 1, 90)).await.unwrap();
        // Same second, lower position: still no regression.
        upsert_dialog(&db, &touch(1, peer, 1, 101)).await.unwrap();

        let d = get_dialog(&db, UserId(1), peer).await.unwrap().unwrap();
        assert_eq!(d.top_message_id, 2);
        assert_eq!(d.updated_at, 101);
        assert_eq!(d.pts, 4);
    }

    #[tokio::test]
    async fn read_pointer_never_regresses() {
        let (_dir, db) = open_test_db().await;
        let peer = Peer::user(UserId(2));
        for top in 1..=6 {
            upsert_dialog(&db, &touch(1, peer, top, 100 + top)).await.unwrap();
            increment_unread(&db, UserId(1), peer, top == 6).await.unwrap();
        }
        let before = get_dialog(&db, UserId(1), peer).await.unwrap().unwrap();
        assert_eq!(before.unread_count, 6);
        assert_eq!(before.unread_mentions_count, 1);

        assert!(advance_read_pointer(&db, UserId(1), peer, 5).await.unwrap());
        upsert_dialog(&db, &touch(1, peer, 7, 200)).await.unwrap();
        increment_unread(&db, UserId(1), peer, false).await.unwrap();

        assert!(!advance_read_pointer(&db, UserId(1), peer, 3).await.unwrap());
        let after = get_dialog(&db, UserId(1), peer).await.unwrap().unwrap();
        assert_eq!(after.read_inbox_max_id, 5);
        assert_eq!(after.unread_count, 1);
    }

    #[tokio::test]
    async fn unread_stays_zero_when_read_covers_top() {
        let (_dir, db) = open_test_db().await;
        let peer = Peer::user(UserId(2));
        upsert_dialog(&db, &touch(1, peer, 3, 100)).await.unwrap();
        advance_read_pointer(&db, UserId(1), peer, 3).await.unwrap();
        increment_unread(&db, UserId(1), peer, true).await.unwrap();

        let d = get_dialog(&db, UserId(1), peer).await.unwrap().unwrap();
        assert_eq!(d.unread_count, 0);
        assert_eq!(d.unread_mentions_count, 0);
    }

    #[tokio::test]
    async fn outbox_pointer_is_monotonic() {
        let (_dir, db) = open_test_db().await;
        let peer = Peer::user(UserId(1));
        upsert_dialog(&db, &touch(2, peer, 8, 100)).await.unwrap();
        assert!(advance_outbox_pointer(&db, UserId(2), peer, 8).await.unwrap());
        assert!(!advance_outbox_pointer(&db, UserId(2), peer, 2).await.unwrap());
        let d = get_dialog(&db, UserId(2), peer).await.unwrap().unwrap();
        assert_eq!(d.read_outbox_max_id, 8);
    }

    #[tokio::test]
    async fn list_orders_pinned_first_then_recent() {
        let (_dir, db) = open_test_db().await;
        let old = Peer::user(UserId(2));
        let mid = Peer::new(10, PeerType::Chat);
        let new = Peer::new(11, PeerType::Channel);
        upsert_dialog(&db, &touch(1, old, 1, 100)).await.unwrap();
        upsert_dialog(&db, &touch(1, mid, 1, 200)).await.unwrap();
        upsert_dialog(&db, &touch(1, new, 1, 300)).await.unwrap();

        let pin = DialogPrefs {
            pinned: Some(true),
            ..Default::default()
        };
        update_dialog_prefs(&db, UserId(1), old, &pin).await.unwrap().unwrap();

        let order: Vec<i64> = list_dialogs(&db, &list(1))
            .await
            .unwrap()
            .iter()
            .map(|d| d.peer_id)
            .collect();
        assert_eq!(order, vec![2, 11, 10]);

        let before_mid = list_dialogs(
            &db,
            &DialogQuery {
                offset_date: Some(200),
                ..list(1)
            },
        )
        .await
        .unwrap();
        assert_eq!(before_mid.len(), 1);
        assert_eq!(before_mid[0].peer(), old);
    }

    #[tokio::test]
    async fn prefs_update_pin_order_and_draft() {
        let (_dir, db) = open_test_db().await;
        let a = Peer::user(UserId(2));
        let b = Peer::user(UserId(3));
        upsert_dialog(&db, &touch(1, a, 1, 100)).await.unwrap();
        upsert_dialog(&db, &touch(1, b, 1, 100)).await.unwrap();

        let pin = DialogPrefs {
            pinned: Some(true),
            draft: Some("half-typed".into()),
            ..Default::default()
        };
        let da = update_dialog_prefs(&db, UserId(1), a, &pin).await.unwrap().unwrap();
        let db_ = update_dialog_prefs(&db, UserId(1), b, &pin).await.unwrap().unwrap();
        assert_eq!(da.pinned_order, Some(1));
        assert_eq!(db_.pinned_order, Some(2));
        assert_eq!(da.draft.as_deref(), Some("half-typed"));

        let clear = DialogPrefs {
            pinned: Some(false),
            draft: Some(String::new()),
            mute_until: Some(500),
            ..Default::default()
        };
        let cleared = update_dialog_prefs(&db, UserId(1), a, &clear).await.unwrap().unwrap();
        assert!(!cleared.is_pinned);
        assert_eq!(cleared.pinned_order, None);
        assert_eq!(cleared.draft, None);
        assert_eq!(cleared.mute_until, Some(500));

        let missing = update_dialog_prefs(&db, UserId(1), Peer::user(UserId(9)), &pin)
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
