// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the hub, the sequencer, and the store.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a user account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a call known to the call lookup collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub i64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Kind of conversation partner.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PeerType {
    /// Direct conversation with another user.
    User,
    /// Group chat.
    Chat,
    /// Broadcast channel.
    Channel,
}

/// The addressee of a message stream.
///
/// Every `(id, peer_type)` pair owns its own gapless id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    pub id: i64,
    pub peer_type: PeerType,
}

impl Peer {
    pub fn new(id: i64, peer_type: PeerType) -> Self {
        Self { id, peer_type }
    }

    /// A direct-conversation peer.
    pub fn user(user: UserId) -> Self {
        Self::new(user.0, PeerType::User)
    }

    pub fn is_direct(&self) -> bool {
        self.peer_type == PeerType::User
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.peer_type, self.id)
    }
}

/// Opaque reference to uploaded media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: String,
    pub media_type: String,
}

/// A persisted message.
///
/// `id` is the store-wide row identifier; `stream_message_id` is the ordered
/// position inside the `(peer_id, peer_type)` stream. See
/// [`Message::position`] for the key dialogs and history pages use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub stream_message_id: i64,
    pub from_id: UserId,
    pub peer_id: i64,
    pub peer_type: PeerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Unix seconds.
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fwd_from_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fwd_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
    /// Formatting annotations, stored and returned verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<serde_json::Value>,
    #[serde(default)]
    pub is_out: bool,
    #[serde(default)]
    pub is_mentioned: bool,
    #[serde(default)]
    pub is_media_unread: bool,
    #[serde(default)]
    pub is_silent: bool,
    #[serde(default)]
    pub is_pinned: bool,
}

impl Message {
    pub fn peer(&self) -> Peer {
        Peer::new(self.peer_id, self.peer_type)
    }

    /// Ordering key of this message inside its conversation.
    ///
    /// A direct conversation interleaves two streams whose ids overlap, so it
    /// is ordered by the row id. Every other conversation is one stream.
    pub fn position(&self) -> i64 {
        if self.peer_type == PeerType::User {
            self.id
        } else {
            self.stream_message_id
        }
    }

    /// Whether `viewer` can see this message in its conversation with `peer`.
    ///
    /// A direct conversation spans two streams: the viewer's messages to the
    /// peer and the peer's messages to the viewer.
    pub fn belongs_to_conversation(&self, viewer: UserId, peer: Peer) -> bool {
        if peer.is_direct() {
            (self.from_id == viewer && self.peer() == peer)
                || (self.from_id.0 == peer.id && self.peer() == Peer::user(viewer))
        } else {
            self.peer() == peer
        }
    }
}

/// One user's summary of a conversation.
///
/// `top_message_id` and the read pointers hold [`Message::position`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    pub owner_id: UserId,
    pub peer_id: i64,
    pub peer_type: PeerType,
    pub top_message_id: i64,
    pub read_inbox_max_id: i64,
    pub read_outbox_max_id: i64,
    pub unread_count: i64,
    pub unread_mentions_count: i64,
    pub unread_reactions_count: i64,
    pub pts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<String>,
    pub folder_id: i32,
    pub is_pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mute_until: Option<i64>,
    pub notify_silent: bool,
    /// Unix seconds of the last top-message change.
    pub updated_at: i64,
}

impl Dialog {
    pub fn peer(&self) -> Peer {
        Peer::new(self.peer_id, self.peer_type)
    }
}

/// Dialog upsert carrying a new top message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogTouch {
    pub owner_id: UserId,
    pub peer: Peer,
    pub top_message_id: i64,
    pub date: i64,
    /// Per-user update sequence stamped on the dialog, when one was allocated.
    pub pts: Option<i64>,
}

/// Partial update of dialog preferences. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogPrefs {
    #[serde(default)]
    pub pinned: Option<bool>,
    /// An empty string clears the draft.
    #[serde(default)]
    pub draft: Option<String>,
    #[serde(default)]
    pub mute_until: Option<i64>,
    #[serde(default)]
    pub notify_silent: Option<bool>,
    #[serde(default)]
    pub folder_id: Option<i32>,
}

/// Page request for a conversation's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub viewer: UserId,
    pub peer: Peer,
    /// Exclusive upper bound on [`Message::position`].
    pub offset_message_id: Option<i64>,
    pub limit: u32,
}

/// Page request for a user's dialog list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogQuery {
    pub owner_id: UserId,
    pub offset_date: Option<i64>,
    pub limit: u32,
}

/// Lifecycle state of a call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Requested,
    Ringing,
    Accepted,
    Ended,
}

/// Snapshot of a call fetched for a single signaling relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    pub call_id: CallId,
    pub caller_id: UserId,
    pub callee_id: UserId,
    pub state: CallState,
}

impl CallInfo {
    /// The other participant, or `None` when `user` is not part of the call.
    pub fn peer_of(&self, user: UserId) -> Option<UserId> {
        if user == self.caller_id {
            Some(self.callee_id)
        } else if user == self.callee_id {
            Some(self.caller_id)
        } else {
            None
        }
    }
}

/// Identity a transport credential resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: UserId,
}
