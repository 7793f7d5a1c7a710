// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable persistence for messages and dialogs.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Dialog, DialogPrefs, DialogQuery, DialogTouch, HistoryQuery, Message, Peer, UserId,
};

/// Storage primitives the message sequencer is built on.
///
/// Implementations must make [`next_stream_id`](Self::next_stream_id) safe
/// under concurrent callers for the same stream.
#[async_trait]
pub trait ConversationStore: PluginAdapter {
    /// Atomically allocate the next identifier of `peer`'s stream.
    async fn next_stream_id(&self, peer: Peer) -> Result<i64, CourierError>;

    /// Give back `id` if it is still the latest allocation of `peer`'s stream.
    ///
    /// Called when the insert that consumed `id` failed, so the stream stays gapless.
    async fn release_stream_id(&self, peer: Peer, id: i64) -> Result<(), CourierError>;

    /// Persist a message and return its store-wide row id.
    async fn insert_message(&self, message: &Message) -> Result<i64, CourierError>;

    /// Look up a message by its client idempotency key.
    async fn find_by_random_key(&self, random_id: i64) -> Result<Option<Message>, CourierError>;

    /// Load a message by row id.
    async fn get_message(&self, id: i64) -> Result<Option<Message>, CourierError>;

    /// Create the dialog if absent, then move its top message forward.
    async fn upsert_dialog(&self, touch: &DialogTouch) -> Result<(), CourierError>;

    /// Bump the unread counter (and the mention counter when `mentioned`).
    async fn increment_unread(
        &self,
        owner: UserId,
        peer: Peer,
        mentioned: bool,
    ) -> Result<(), CourierError>;

    /// Bump the user's update sequence and return the new value.
    async fn increment_pts(&self, user: UserId) -> Result<i64, CourierError>;

    /// Newest-first page of a conversation.
    async fn list_history(&self, query: &HistoryQuery) -> Result<Vec<Message>, CourierError>;

    /// Pinned-first, then most-recently-updated dialogs.
    async fn list_dialogs(&self, query: &DialogQuery) -> Result<Vec<Dialog>, CourierError>;

    async fn get_dialog(&self, owner: UserId, peer: Peer) -> Result<Option<Dialog>, CourierError>;

    /// Move the inbox read pointer to `max_id` and clear unread counters.
    ///
    /// Returns `false` without touching the row when `max_id` does not exceed
    /// the current pointer.
    async fn advance_read_pointer(
        &self,
        owner: UserId,
        peer: Peer,
        max_id: i64,
    ) -> Result<bool, CourierError>;

    /// Move the outbox read pointer forward; never regresses.
    async fn advance_outbox_pointer(
        &self,
        owner: UserId,
        peer: Peer,
        max_id: i64,
    ) -> Result<bool, CourierError>;

    /// Delete the listed messages authored by `user`; returns the removed rows.
    async fn delete_owned(&self, user: UserId, ids: &[i64]) -> Result<Vec<Message>, CourierError>;

    /// Replace text and entities of a message authored by `user`.
    ///
    /// Returns `None` when no such message exists for that author.
    async fn update_text(
        &self,
        user: UserId,
        id: i64,
        text: &str,
        entities: Option<serde_json::Value>,
        edit_date: i64,
    ) -> Result<Option<Message>, CourierError>;

    /// Apply a partial preferences update to an existing dialog.
    async fn update_dialog_prefs(
        &self,
        owner: UserId,
        peer: Peer,
        prefs: &DialogPrefs,
    ) -> Result<Option<Dialog>, CourierError>;
}
