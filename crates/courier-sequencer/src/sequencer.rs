// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered message ids, idempotent sends, and per-user dialog state.

use std::collections::HashMap;
use std::sync::Arc;

use courier_config::model::SequencerConfig;
use courier_core::{
    unix_now, ConversationStore, CourierError, Dialog, DialogPrefs, DialogQuery, HistoryQuery,
    MediaRef, Message, Peer, PeerType, ServerEnvelope, UpdateNotifier, UserId,
};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::side_effects::{spawn_retry, SideEffectPlan};

/// Page size when the caller gives none.
pub const DEFAULT_LIMIT: u32 = 50;
/// Largest page a caller may request.
pub const MAX_LIMIT: u32 = 100;

/// Clamp a requested page size into `[1, MAX_LIMIT]`.
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.map_or(DEFAULT_LIMIT, |l| l.clamp(1, MAX_LIMIT))
}

/// A new message to append to `peer`'s stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SendMessage {
    pub sender: UserId,
    pub peer: Peer,
    pub text: Option<String>,
    /// Client idempotency key.
    pub random_id: Option<i64>,
    pub reply_to_message_id: Option<i64>,
    pub media: Option<MediaRef>,
    pub entities: Option<serde_json::Value>,
    pub silent: bool,
}

impl SendMessage {
    pub fn text(sender: UserId, peer: Peer, text: impl Into<String>) -> Self {
        Self {
            sender,
            peer,
            text: Some(text.into()),
            random_id: None,
            reply_to_message_id: None,
            media: None,
            entities: None,
            silent: false,
        }
    }

    pub fn with_random_id(mut self, random_id: i64) -> Self {
        self.random_id = Some(random_id);
        self
    }

    fn validate(&self) -> Result<(), CourierError> {
        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_text && self.media.is_none() {
            return Err(CourierError::Validation(
                "message needs text or media".to_string(),
            ));
        }
        Ok(())
    }

    fn into_draft(self, date: i64) -> Message {
        Message {
            id: 0,
            stream_message_id: 0,
            from_id: self.sender,
            peer_id: self.peer.id,
            peer_type: self.peer.peer_type,
            text: self.text,
            date,
            random_id: self.random_id,
            reply_to_message_id: self.reply_to_message_id,
            fwd_from_id: None,
            fwd_date: None,
            edit_date: None,
            media: self.media,
            entities: self.entities,
            is_out: true,
            is_mentioned: false,
            is_media_unread: false,
            is_silent: self.silent,
            is_pinned: false,
        }
    }
}

/// The message sequencer.
///
/// Identifier allocation is serialized per stream; unrelated streams never
/// contend. Live notifications are best-effort and carry no durability.
pub struct Sequencer {
    store: Arc<dyn ConversationStore>,
    notifier: Arc<dyn UpdateNotifier>,
    config: SequencerConfig,
    stream_locks: DashMap<Peer, Arc<Mutex<()>>>,
}

impl Sequencer {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        notifier: Arc<dyn UpdateNotifier>,
        config: SequencerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
            stream_locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    fn stream_lock(&self, peer: Peer) -> Arc<Mutex<()>> {
        Arc::clone(&self.stream_locks.entry(peer).or_default())
    }

    /// Persist a new message, or return the earlier one with the same `random_id`.
    pub async fn send(&self, request: SendMessage) -> Result<Message, CourierError> {
        request.validate()?;

        if let Some(random_id) = request.random_id
            && let Some(existing) = self.store.find_by_random_key(random_id).await?
        {
            debug!(random_id, message_id = existing.id, "duplicate send, returning original");
            return Ok(existing);
        }

        let (message, fresh) = self.commit(request.into_draft(unix_now())).await?;
        if fresh {
            self.after_commit(&message).await;
        }
        Ok(message)
    }

    /// Allocate a stream id and insert under the stream lock.
    ///
    /// Returns `false` alongside a message that another caller committed
    /// first with the same `random_id`.
    async fn commit(&self, mut draft: Message) -> Result<(Message, bool), CourierError> {
        let peer = draft.peer();
        let lock = self.stream_lock(peer);
        let _guard = lock.lock().await;

        let stream_id = self.store.next_stream_id(peer).await?;
        draft.stream_message_id = stream_id;

        match self.store.insert_message(&draft).await {
            Ok(id) => {
                draft.id = id;
                debug!(%peer, stream_id, message_id = id, "message committed");
                Ok((draft, true))
            }
            Err(insert_err) => {
                if let Err(e) = self.store.release_stream_id(peer, stream_id).await {
                    warn!(%peer, stream_id, error = %e, "failed to release stream id");
                }
                if let Some(random_id) = draft.random_id
                    && let Some(existing) = self.store.find_by_random_key(random_id).await?
                {
                    return Ok((existing, false));
                }
                Err(insert_err)
            }
        }
    }

    /// Dialog/unread/pts updates plus live notifications for a fresh message.
    async fn after_commit(&self, message: &Message) {
        courier_prometheus::record_message_sent(&message.peer_type.to_string());

        let mut plan = SideEffectPlan::new(message.clone());
        if let Err(e) = plan.run(self.store.as_ref()).await {
            warn!(message_id = message.id, error = %e, "side effects failed, retrying in background");
            spawn_retry(
                Arc::clone(&self.store),
                plan.clone(),
                self.config.side_effect_retries,
                self.config.side_effect_retry_base_ms,
            );
        }

        self.notifier.notify(
            message.from_id,
            &ServerEnvelope::NewMessage {
                message: message.clone(),
                pts: None,
            },
        );
        if let Some(recipient) = plan.recipient() {
            let mut incoming = message.clone();
            incoming.is_out = false;
            self.notifier.notify(
                recipient,
                &ServerEnvelope::NewMessage {
                    message: incoming,
                    pts: plan.recipient_pts(),
                },
            );
        }
    }

    /// Newest-first page of the conversation with `peer`.
    pub async fn get_history(
        &self,
        viewer: UserId,
        peer: Peer,
        offset_message_id: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, CourierError> {
        self.store
            .list_history(&HistoryQuery {
                viewer,
                peer,
                offset_message_id,
                limit: clamp_limit(limit),
            })
            .await
    }

    /// Pinned dialogs first, then most recently updated.
    pub async fn get_dialogs(
        &self,
        owner: UserId,
        offset_date: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<Dialog>, CourierError> {
        self.store
            .list_dialogs(&DialogQuery {
                owner_id: owner,
                offset_date,
                limit: clamp_limit(limit),
            })
            .await
    }

    /// Advance the inbox read pointer. Returns `false` when it would not move forward.
    ///
    /// For direct conversations the peer's outbox pointer follows and the
    /// peer is told about it.
    pub async fn mark_as_read(
        &self,
        user: UserId,
        peer: Peer,
        max_message_id: i64,
    ) -> Result<bool, CourierError> {
        let advanced = self
            .store
            .advance_read_pointer(user, peer, max_message_id)
            .await?;
        if !advanced {
            debug!(user = %user, %peer, max_message_id, "read pointer unchanged");
            return Ok(false);
        }

        if peer.is_direct() && peer.id != user.0 {
            let other = UserId(peer.id);
            self.store
                .advance_outbox_pointer(other, Peer::user(user), max_message_id)
                .await?;
            self.notifier.notify(
                other,
                &ServerEnvelope::ReadHistory {
                    peer_id: user.0,
                    peer_type: PeerType::User,
                    max_id: max_message_id,
                },
            );
        }
        Ok(true)
    }

    /// Replace the text of a message `user` authored.
    pub async fn edit_message(
        &self,
        user: UserId,
        message_id: i64,
        text: &str,
        entities: Option<serde_json::Value>,
    ) -> Result<Message, CourierError> {
        if text.trim().is_empty() {
            return Err(CourierError::Validation("edited text is empty".to_string()));
        }
        let original = self
            .store
            .get_message(message_id)
            .await?
            .ok_or_else(|| CourierError::not_found("message", message_id))?;
        if original.from_id != user {
            return Err(CourierError::Authorization(format!(
                "message {message_id} was not sent by user {user}"
            )));
        }

        let edited = self
            .store
            .update_text(user, message_id, text, entities, unix_now())
            .await?
            .ok_or_else(|| CourierError::not_found("message", message_id))?;

        self.notifier.notify(
            user,
            &ServerEnvelope::EditMessage {
                message: edited.clone(),
            },
        );
        if let Some(recipient) = direct_recipient(&edited) {
            let mut incoming = edited.clone();
            incoming.is_out = false;
            self.notifier
                .notify(recipient, &ServerEnvelope::EditMessage { message: incoming });
        }
        Ok(edited)
    }

    /// Delete messages `user` authored; other ids are silently skipped.
    ///
    /// Returns the ids that were removed.
    pub async fn delete_messages(
        &self,
        user: UserId,
        message_ids: &[i64],
    ) -> Result<Vec<i64>, CourierError> {
        let removed = self.store.delete_owned(user, message_ids).await?;
        let ids: Vec<i64> = removed.iter().map(|m| m.id).collect();
        if ids.is_empty() {
            return Ok(ids);
        }
        info!(user = %user, count = ids.len(), "messages deleted");

        let mut by_recipient: HashMap<UserId, Vec<i64>> = HashMap::new();
        for message in &removed {
            if let Some(recipient) = direct_recipient(message) {
                by_recipient.entry(recipient).or_default().push(message.id);
            }
        }
        self.notifier.notify(
            user,
            &ServerEnvelope::DeleteMessages {
                message_ids: ids.clone(),
            },
        );
        for (recipient, message_ids) in by_recipient {
            self.notifier
                .notify(recipient, &ServerEnvelope::DeleteMessages { message_ids });
        }
        Ok(ids)
    }

    /// Copy messages from the `from_peer` conversation into `to_peer`.
    ///
    /// Missing or foreign ids, and ids whose copy fails, are skipped; the
    /// result holds only the new messages, in request order.
    pub async fn forward_messages(
        &self,
        sender: UserId,
        from_peer: Peer,
        to_peer: Peer,
        message_ids: &[i64],
    ) -> Result<Vec<Message>, CourierError> {
        let mut forwarded = Vec::with_capacity(message_ids.len());
        for &id in message_ids {
            let source = match self.store.get_message(id).await {
                Ok(Some(m)) if m.belongs_to_conversation(sender, from_peer) => m,
                Ok(_) => {
                    debug!(message_id = id, %from_peer, "forward source not visible, skipped");
                    continue;
                }
                Err(e) => {
                    warn!(message_id = id, error = %e, "forward source lookup failed, skipped");
                    continue;
                }
            };

            let draft = Message {
                id: 0,
                stream_message_id: 0,
                from_id: sender,
                peer_id: to_peer.id,
                peer_type: to_peer.peer_type,
                text: source.text.clone(),
                date: unix_now(),
                random_id: None,
                reply_to_message_id: None,
                fwd_from_id: Some(source.fwd_from_id.unwrap_or(source.from_id)),
                fwd_date: Some(source.fwd_date.unwrap_or(source.date)),
                edit_date: None,
                media: source.media.clone(),
                entities: source.entities.clone(),
                is_out: true,
                is_mentioned: false,
                is_media_unread: source.media.is_some(),
                is_silent: false,
                is_pinned: false,
            };

            match self.commit(draft).await {
                Ok((message, _)) => {
                    self.after_commit(&message).await;
                    forwarded.push(message);
                }
                Err(e) => {
                    warn!(message_id = id, %to_peer, error = %e, "forward failed, skipped");
                }
            }
        }
        Ok(forwarded)
    }

    /// Load one message as seen by `viewer`.
    pub async fn get_message(&self, viewer: UserId, message_id: i64) -> Result<Message, CourierError> {
        let mut message = self
            .store
            .get_message(message_id)
            .await?
            .filter(|m| visible_to(m, viewer))
            .ok_or_else(|| CourierError::not_found("message", message_id))?;
        message.is_out = message.from_id == viewer;
        Ok(message)
    }

    /// Apply a partial preferences update to an existing dialog.
    pub async fn update_dialog_prefs(
        &self,
        owner: UserId,
        peer: Peer,
        prefs: &DialogPrefs,
    ) -> Result<Dialog, CourierError> {
        self.store
            .update_dialog_prefs(owner, peer, prefs)
            .await?
            .ok_or_else(|| CourierError::not_found("dialog", peer))
    }
}

fn direct_recipient(message: &Message) -> Option<UserId> {
    let peer = message.peer();
    (peer.is_direct() && peer.id != message.from_id.0).then_some(UserId(peer.id))
}

/// Direct messages are private to their two users; group membership is not
/// modeled, so other streams are readable.
fn visible_to(message: &Message, viewer: UserId) -> bool {
    !message.peer().is_direct() || message.from_id == viewer || message.peer_id == viewer.0
}
