// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequencer behavior against a real SQLite store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use courier_config::model::{SequencerConfig, StorageConfig};
use courier_core::{
    ConversationStore, CourierError, Dialog, DialogPrefs, DialogQuery, DialogTouch, HistoryQuery,
    Message, Peer, PeerType, PluginAdapter, ServerEnvelope, UpdateNotifier, UserId,
};
use courier_sequencer::{SendMessage, Sequencer};
use courier_storage::SqliteStore;
use tempfile::TempDir;

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<(UserId, ServerEnvelope)>>,
}

impl Recorder {
    fn for_user(&self, user: UserId) -> Vec<ServerEnvelope> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

impl UpdateNotifier for Recorder {
    fn notify(&self, user: UserId, update: &ServerEnvelope) -> usize {
        self.sent.lock().unwrap().push((user, update.clone()));
        1
    }
}

async fn sqlite() -> (TempDir, Arc<SqliteStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(StorageConfig {
        database_path: dir.path().join("seq.db").to_string_lossy().to_string(),
        wal_mode: true,
    });
    store.initialize().await.unwrap();
    (dir, Arc::new(store))
}

async fn setup() -> (TempDir, Arc<SqliteStore>, Arc<Recorder>, Sequencer) {
    let (dir, store) = sqlite().await;
    let recorder = Arc::new(Recorder::default());
    let seq = Sequencer::new(store.clone(), recorder.clone(), SequencerConfig::default());
    (dir, store, recorder, seq)
}

const ALICE: UserId = UserId(1);
const BOB: UserId = UserId(2);
const CAROL: UserId = UserId(3);

#[tokio::test]
async fn send_updates_both_dialogs_and_recipient_counters() {
    let (_dir, store, recorder, seq) = setup().await;
    let sent = seq.send(SendMessage::text(ALICE, Peer::user(BOB), "hello")).await.unwrap();
    assert_eq!(sent.stream_message_id, 1);
    assert!(sent.is_out);

    let alice_dialog = store.get_dialog(ALICE, Peer::user(BOB)).await.unwrap().unwrap();
    assert_eq!(alice_dialog.top_message_id, 1);
    assert_eq!(alice_dialog.unread_count, 0);

    let bob_dialog = store.get_dialog(BOB, Peer::user(ALICE)).await.unwrap().unwrap();
    assert_eq!(bob_dialog.top_message_id, 1);
    assert_eq!(bob_dialog.unread_count, 1);
    assert_eq!(bob_dialog.pts, 1);

    let to_bob = recorder.for_user(BOB);
    assert_eq!(to_bob.len(), 1);
    match &to_bob[0] {
        ServerEnvelope::NewMessage { message, pts } => {
            assert!(!message.is_out);
            assert_eq!(*pts, Some(1));
        }
        other => panic!("unexpected envelope {other:?}"),
    }
    assert_eq!(recorder.for_user(ALICE).len(), 1);
}

#[tokio::test]
async fn duplicate_random_id_returns_original_without_side_effects() {
    let (_dir, store, _recorder, seq) = setup().await;
    let request = SendMessage::text(ALICE, Peer::user(BOB), "once").with_random_id(42);
    let first = seq.send(request.clone()).await.unwrap();
    let second = seq.send(request).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.stream_message_id, second.stream_message_id);

    let bob_dialog = store.get_dialog(BOB, Peer::user(ALICE)).await.unwrap().unwrap();
    assert_eq!(bob_dialog.unread_count, 1);
    assert_eq!(bob_dialog.pts, 1);

    let history = seq.get_history(BOB, Peer::user(ALICE), None, None).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn concurrent_sends_yield_contiguous_ids() {
    let (_dir, _store, _recorder, seq) = setup().await;
    let seq = Arc::new(seq);
    let chat = Peer::new(500, PeerType::Chat);

    let tasks: Vec<_> = (0..25)
        .map(|i| {
            let seq = Arc::clone(&seq);
            tokio::spawn(async move {
                seq.send(SendMessage::text(UserId(i % 5 + 1), chat, format!("m{i}")))
                    .await
                    .unwrap()
                    .stream_message_id
            })
        })
        .collect();

    let mut ids: Vec<i64> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=25).collect::<Vec<_>>());
}

#[tokio::test]
async fn concurrent_retries_with_same_key_commit_once() {
    let (_dir, _store, _recorder, seq) = setup().await;
    let seq = Arc::new(seq);
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let seq = Arc::clone(&seq);
            tokio::spawn(async move {
                seq.send(SendMessage::text(ALICE, Peer::user(BOB), "retry").with_random_id(7))
                    .await
                    .unwrap()
                    .id
            })
        })
        .collect();
    let ids: Vec<i64> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));

    let next = seq.send(SendMessage::text(ALICE, Peer::user(BOB), "after")).await.unwrap();
    assert_eq!(next.stream_message_id, 2, "stream must stay gapless");
}

#[tokio::test]
async fn history_pagination_returns_older_page() {
    let (_dir, _store, _recorder, seq) = setup().await;
    let chat = Peer::new(10, PeerType::Chat);
    for i in 1..=10 {
        seq.send(SendMessage::text(ALICE, chat, format!("m{i}"))).await.unwrap();
    }
    let page = seq.get_history(BOB, chat, Some(7), Some(3)).await.unwrap();
    let ids: Vec<i64> = page.iter().map(|m| m.stream_message_id).collect();
    assert_eq!(ids, vec![6, 5, 4]);
}

#[tokio::test]
async fn history_includes_both_directions() {
    let (_dir, _store, _recorder, seq) = setup().await;
    seq.send(SendMessage::text(ALICE, Peer::user(BOB), "hi bob")).await.unwrap();
    seq.send(SendMessage::text(BOB, Peer::user(ALICE), "hi alice")).await.unwrap();
    seq.send(SendMessage::text(CAROL, Peer::user(BOB), "not yours")).await.unwrap();

    let page = seq.get_history(ALICE, Peer::user(BOB), None, None).await.unwrap();
    let texts: Vec<_> = page.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(texts, vec!["hi alice", "hi bob"]);
    assert!(!page[0].is_out);
    assert!(page[1].is_out);
}

#[tokio::test]
async fn direct_history_pages_reach_both_directions() {
    let (_dir, _store, _recorder, seq) = setup().await;
    for i in 0..10 {
        seq.send(SendMessage::text(ALICE, Peer::user(BOB), format!("a{i}"))).await.unwrap();
    }
    for i in 0..3 {
        seq.send(SendMessage::text(BOB, Peer::user(ALICE), format!("b{i}"))).await.unwrap();
    }

    let mut texts = Vec::new();
    let mut offset = None;
    loop {
        let page = seq.get_history(ALICE, Peer::user(BOB), offset, Some(3)).await.unwrap();
        let Some(last) = page.last() else { break };
        offset = Some(last.position());
        texts.extend(page.iter().filter_map(|m| m.text.clone()));
    }

    let mut expected: Vec<String> = (0..3).rev().map(|i| format!("b{i}")).collect();
    expected.extend((0..10).rev().map(|i| format!("a{i}")));
    assert_eq!(texts, expected);
}

#[tokio::test]
async fn own_reply_keeps_dialog_top_and_unread_consistent() {
    let (_dir, store, _recorder, seq) = setup().await;
    let mut last_from_bob = None;
    for i in 0..9 {
        last_from_bob =
            Some(seq.send(SendMessage::text(BOB, Peer::user(ALICE), format!("m{i}"))).await.unwrap());
    }
    let fifth = seq.get_history(ALICE, Peer::user(BOB), None, None).await.unwrap()[4].position();
    assert!(seq.mark_as_read(ALICE, Peer::user(BOB), fifth).await.unwrap());

    let before = store.get_dialog(ALICE, Peer::user(BOB)).await.unwrap().unwrap();
    assert_eq!(before.top_message_id, last_from_bob.unwrap().position());

    let reply = seq.send(SendMessage::text(ALICE, Peer::user(BOB), "reply")).await.unwrap();
    assert_eq!(reply.stream_message_id, 1);

    let after = store.get_dialog(ALICE, Peer::user(BOB)).await.unwrap().unwrap();
    assert_eq!(after.top_message_id, reply.position());
    assert!(after.top_message_id > before.top_message_id);
    assert_eq!(after.read_inbox_max_id, fifth);
    assert_eq!(after.unread_count, before.unread_count);
    assert!(after.read_inbox_max_id < after.top_message_id);

    let bob_dialog = store.get_dialog(BOB, Peer::user(ALICE)).await.unwrap().unwrap();
    assert_eq!(bob_dialog.top_message_id, reply.position());
    assert_eq!(bob_dialog.unread_count, 1);

    assert!(seq.mark_as_read(BOB, Peer::user(ALICE), reply.position()).await.unwrap());
    let bob_dialog = store.get_dialog(BOB, Peer::user(ALICE)).await.unwrap().unwrap();
    assert_eq!(bob_dialog.unread_count, 0);
    assert!(bob_dialog.read_inbox_max_id >= bob_dialog.top_message_id);
}

#[tokio::test]
async fn read_pointer_is_monotonic() {
    let (_dir, store, recorder, seq) = setup().await;
    for i in 0..6 {
        seq.send(SendMessage::text(BOB, Peer::user(ALICE), format!("m{i}"))).await.unwrap();
    }

    assert!(seq.mark_as_read(ALICE, Peer::user(BOB), 5).await.unwrap());
    seq.send(SendMessage::text(BOB, Peer::user(ALICE), "late")).await.unwrap();
    let before = store.get_dialog(ALICE, Peer::user(BOB)).await.unwrap().unwrap();

    assert!(!seq.mark_as_read(ALICE, Peer::user(BOB), 3).await.unwrap());
    let after = store.get_dialog(ALICE, Peer::user(BOB)).await.unwrap().unwrap();
    assert_eq!(after.read_inbox_max_id, 5);
    assert_eq!(after.unread_count, before.unread_count);
    assert_eq!(after.unread_count, 1);

    let bob_view = store.get_dialog(BOB, Peer::user(ALICE)).await.unwrap().unwrap();
    assert_eq!(bob_view.read_outbox_max_id, 5);
    assert!(recorder.for_user(BOB).iter().any(|e| matches!(
        e,
        ServerEnvelope::ReadHistory { peer_id: 1, max_id: 5, .. }
    )));
}

#[tokio::test]
async fn edit_requires_author() {
    let (_dir, _store, recorder, seq) = setup().await;
    let sent = seq.send(SendMessage::text(ALICE, Peer::user(BOB), "typo")).await.unwrap();

    let err = seq.edit_message(BOB, sent.id, "hijack", None).await.unwrap_err();
    assert!(matches!(err, CourierError::Authorization(_)));

    let err = seq.edit_message(ALICE, 9_999, "x", None).await.unwrap_err();
    assert!(matches!(err, CourierError::NotFound { .. }));

    let edited = seq.edit_message(ALICE, sent.id, "fixed", None).await.unwrap();
    assert_eq!(edited.text.as_deref(), Some("fixed"));
    assert!(edited.edit_date.is_some());
    assert!(recorder
        .for_user(BOB)
        .iter()
        .any(|e| matches!(e, ServerEnvelope::EditMessage { .. })));
}

#[tokio::test]
async fn delete_only_removes_own_messages() {
    let (_dir, _store, _recorder, seq) = setup().await;
    let mine = seq.send(SendMessage::text(ALICE, Peer::user(BOB), "mine")).await.unwrap();
    let theirs = seq.send(SendMessage::text(BOB, Peer::user(ALICE), "theirs")).await.unwrap();

    let removed = seq.delete_messages(ALICE, &[mine.id, theirs.id]).await.unwrap();
    assert_eq!(removed, vec![mine.id]);

    let remaining = seq.get_history(ALICE, Peer::user(BOB), None, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, theirs.id);
}

#[tokio::test]
async fn forward_skips_missing_and_foreign_ids() {
    let (_dir, store, _recorder, seq) = setup().await;
    let a = seq.send(SendMessage::text(BOB, Peer::user(ALICE), "first")).await.unwrap();
    let foreign = seq.send(SendMessage::text(CAROL, Peer::user(BOB), "private")).await.unwrap();
    let b = seq.send(SendMessage::text(ALICE, Peer::user(BOB), "second")).await.unwrap();

    let chat = Peer::new(77, PeerType::Chat);
    let forwarded = seq
        .forward_messages(ALICE, Peer::user(BOB), chat, &[a.id, 404, foreign.id, b.id])
        .await
        .unwrap();

    assert_eq!(forwarded.len(), 2);
    assert_eq!(forwarded[0].text.as_deref(), Some("first"));
    assert_eq!(forwarded[0].fwd_from_id, Some(BOB));
    assert_eq!(forwarded[0].fwd_date, Some(a.date));
    assert_eq!(forwarded[0].stream_message_id, 1);
    assert_eq!(forwarded[1].fwd_from_id, Some(ALICE));
    assert_eq!(forwarded[1].stream_message_id, 2);

    let dialog = store.get_dialog(ALICE, chat).await.unwrap().unwrap();
    assert_eq!(dialog.top_message_id, 2);
}

#[tokio::test]
async fn get_message_hides_other_users_direct_messages() {
    let (_dir, _store, _recorder, seq) = setup().await;
    let sent = seq.send(SendMessage::text(ALICE, Peer::user(BOB), "secret")).await.unwrap();

    let as_bob = seq.get_message(BOB, sent.id).await.unwrap();
    assert!(!as_bob.is_out);
    assert!(seq.get_message(ALICE, sent.id).await.unwrap().is_out);
    assert!(matches!(
        seq.get_message(CAROL, sent.id).await,
        Err(CourierError::NotFound { .. })
    ));
}

#[tokio::test]
async fn dialogs_list_pinned_first() {
    let (_dir, _store, _recorder, seq) = setup().await;
    seq.send(SendMessage::text(ALICE, Peer::user(BOB), "a")).await.unwrap();
    seq.send(SendMessage::text(ALICE, Peer::user(CAROL), "b")).await.unwrap();

    let pinned = seq
        .update_dialog_prefs(
            ALICE,
            Peer::user(BOB),
            &DialogPrefs {
                pinned: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(pinned.is_pinned);

    let dialogs = seq.get_dialogs(ALICE, None, None).await.unwrap();
    assert_eq!(dialogs[0].peer(), Peer::user(BOB));
    assert_eq!(dialogs.len(), 2);

    let missing = seq
        .update_dialog_prefs(ALICE, Peer::user(UserId(99)), &DialogPrefs::default())
        .await;
    assert!(matches!(missing, Err(CourierError::NotFound { .. })));
}

/// Fails the first `failures` recipient dialog upserts.
struct FlakyStore {
    inner: Arc<SqliteStore>,
    failures: AtomicUsize,
}

#[async_trait]
impl PluginAdapter for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }
}

#[async_trait]
impl ConversationStore for FlakyStore {
    async fn next_stream_id(&self, peer: Peer) -> Result<i64, CourierError> {
        self.inner.next_stream_id(peer).await
    }
    async fn release_stream_id(&self, peer: Peer, id: i64) -> Result<(), CourierError> {
        self.inner.release_stream_id(peer, id).await
    }
    async fn insert_message(&self, message: &Message) -> Result<i64, CourierError> {
        self.inner.insert_message(message).await
    }
    async fn find_by_random_key(&self, random_id: i64) -> Result<Option<Message>, CourierError> {
        self.inner.find_by_random_key(random_id).await
    }
    async fn get_message(&self, id: i64) -> Result<Option<Message>, CourierError> {
        self.inner.get_message(id).await
    }
    async fn upsert_dialog(&self, touch: &DialogTouch) -> Result<(), CourierError> {
        if touch.owner_id == BOB
            && self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(CourierError::storage(std::io::Error::other("disk busy")));
        }
        self.inner.upsert_dialog(touch).await
    }
    async fn increment_unread(&self, owner: UserId, peer: Peer, mentioned: bool) -> Result<(), CourierError> {
        self.inner.increment_unread(owner, peer, mentioned).await
    }
    async fn increment_pts(&self, user: UserId) -> Result<i64, CourierError> {
        self.inner.increment_pts(user).await
    }
    async fn list_history(&self, query: &HistoryQuery) -> Result<Vec<Message>, CourierError> {
        self.inner.list_history(query).await
    }
    async fn list_dialogs(&self, query: &DialogQuery) -> Result<Vec<Dialog>, CourierError> {
        self.inner.list_dialogs(query).await
    }
    async fn get_dialog(&self, owner: UserId, peer: Peer) -> Result<Option<Dialog>, CourierError> {
        self.inner.get_dialog(owner, peer).await
    }
    async fn advance_read_pointer(&self, owner: UserId, peer: Peer, max_id: i64) -> Result<bool, CourierError> {
        self.inner.advance_read_pointer(owner, peer, max_id).await
    }
    async fn advance_outbox_pointer(&self, owner: UserId, peer: Peer, max_id: i64) -> Result<bool, CourierError> {
        self.inner.advance_outbox_pointer(owner, peer, max_id).await
    }
    async fn delete_owned(&self, user: UserId, ids: &[i64]) -> Result<Vec<Message>, CourierError> {
        self.inner.delete_owned(user, ids).await
    }
    async fn update_text(
        &self,
        user: UserId,
        id: i64,
        text: &str,
        entities: Option<serde_json::Value>,
        edit_date: i64,
    ) -> Result<Option<Message>, CourierError> {
        self.inner.update_text(user, id, text, entities, edit_date).await
    }
    async fn update_dialog_prefs(
        &self,
        owner: UserId,
        peer: Peer,
        prefs: &DialogPrefs,
    ) -> Result<Option<Dialog>, CourierError> {
        self.inner.update_dialog_prefs(owner, peer, prefs).await
    }
}

#[tokio::test]
async fn failed_side_effects_keep_message_and_recover_in_background() {
    let (_dir, sqlite) = sqlite().await;
    let flaky = Arc::new(FlakyStore {
        inner: sqlite.clone(),
        failures: AtomicUsize::new(2),
    });
    let seq = Sequencer::new(
        flaky,
        Arc::new(Recorder::default()),
        SequencerConfig {
            side_effect_retries: 3,
            side_effect_retry_base_ms: 10,
        },
    );

    let sent = seq.send(SendMessage::text(ALICE, Peer::user(BOB), "durable")).await.unwrap();
    assert!(sqlite.get_message(sent.id).await.unwrap().is_some());
    assert!(sqlite.get_dialog(ALICE, Peer::user(BOB)).await.unwrap().is_some());

    let mut recovered = None;
    for _ in 0..100 {
        if let Some(d) = sqlite.get_dialog(BOB, Peer::user(ALICE)).await.unwrap()
            && d.pts == 1
        {
            recovered = Some(d);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let dialog = recovered.expect("recipient dialog should be repaired");
    assert_eq!(dialog.unread_count, 1);
    assert_eq!(dialog.top_message_id, sent.position());
}
