// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The hub-facing half of a client session.

use std::sync::Arc;

use courier_core::UserId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outbound queue and close signal of one live connection.
///
/// The session actor keeps the matching receiver and watches [`closed`](Self::closed).
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    user_id: UserId,
    tx: mpsc::Sender<Arc<str>>,
    closed: CancellationToken,
}

impl SessionHandle {
    /// Create a handle with a bounded outbound queue of `capacity` frames.
    pub fn new(user_id: UserId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            user_id,
            tx,
            closed: CancellationToken::new(),
        };
        (Arc::new(handle), rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Cancelled once the session is unregistered.
    pub fn closed(&self) -> &CancellationToken {
        &self.closed
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Enqueue without waiting. Returns `false` when the queue is full or gone.
    pub fn offer(&self, payload: Arc<str>) -> bool {
        !self.is_closed() && self.tx.try_send(payload).is_ok()
    }

    pub(crate) fn close(&self) {
        self.closed.cancel();
    }
}
