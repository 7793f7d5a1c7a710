// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User -> live sessions registry.

use std::sync::Arc;

use courier_core::{ServerEnvelope, UpdateNotifier, UserId};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::handle::SessionHandle;

/// Process-wide registry of live sessions, keyed by owning user.
///
/// Registry mutations and fan-out reads for one user are serialized by the
/// map's shard lock. Fan-out never waits on a session: a full queue drops
/// that session's copy.
#[derive(Debug, Default)]
pub struct Hub {
    sessions: DashMap<UserId, Vec<Arc<SessionHandle>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session under its owner's bucket.
    pub fn register(&self, session: Arc<SessionHandle>) {
        let user = session.user_id();
        let id = session.id();
        let count = {
            let mut bucket = self.sessions.entry(user).or_default();
            bucket.push(session);
            bucket.len()
        };
        courier_prometheus::record_session_opened();
        info!(user = %user, session = %id, connections = count, "session registered");
    }

    /// Remove a session and close its outbound queue.
    ///
    /// Returns `true` only for the call that actually removed it; later calls
    /// are no-ops.
    pub fn unregister(&self, session: &SessionHandle) -> bool {
        let user = session.user_id();
        let removed = match self.sessions.get_mut(&user) {
            Some(mut bucket) => {
                let before = bucket.len();
                bucket.retain(|s| s.id() != session.id());
                bucket.len() != before
            }
            None => false,
        };
        self.sessions.remove_if(&user, |_, bucket| bucket.is_empty());
        session.close();

        if removed {
            courier_prometheus::record_session_closed();
            info!(user = %user, session = %session.id(), "session unregistered");
        }
        removed
    }

    /// Serialize `envelope` once and offer it to every session of `user`.
    ///
    /// Returns the number of sessions that accepted the frame. No sessions is
    /// not an error.
    pub fn send_to_user(&self, user: UserId, envelope: &ServerEnvelope) -> usize {
        let payload: Arc<str> = match serde_json::to_string(envelope) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!(user = %user, error = %e, "failed to serialize envelope");
                return 0;
            }
        };
        self.send_raw(user, payload)
    }

    /// Offer an already serialized frame to every session of `user`.
    pub fn send_raw(&self, user: UserId, payload: Arc<str>) -> usize {
        let Some(bucket) = self.sessions.get(&user) else {
            return 0;
        };
        let mut delivered = 0;
        for session in bucket.iter() {
            if session.offer(Arc::clone(&payload)) {
                delivered += 1;
            } else {
                courier_prometheus::record_hub_drop();
                debug!(user = %user, session = %session.id(), "outbound queue full, frame dropped");
            }
        }
        delivered
    }

    pub fn is_online(&self, user: UserId) -> bool {
        self.sessions.get(&user).is_some_and(|b| !b.is_empty())
    }

    /// Users with at least one live session, in no particular order.
    pub fn list_online_users(&self) -> Vec<UserId> {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn connection_count(&self, user: UserId) -> usize {
        self.sessions.get(&user).map_or(0, |b| b.len())
    }

    /// Sessions across all users.
    pub fn total_connections(&self) -> usize {
        self.sessions.iter().map(|entry| entry.value().len()).sum()
    }

    /// Unregister every session, e.g. on shutdown.
    pub fn close_all(&self) -> usize {
        let all: Vec<Arc<SessionHandle>> = self
            .sessions
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        all.iter().filter(|s| self.unregister(s)).count()
    }
}

impl UpdateNotifier for Hub {
    fn notify(&self, user: UserId, update: &ServerEnvelope) -> usize {
        self.send_to_user(user, update)
    }
}
