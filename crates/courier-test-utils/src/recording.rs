// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier that keeps every update for later assertions.

use std::sync::Mutex;

use courier_core::{ServerEnvelope, UpdateNotifier, UserId};

/// Records `(user, envelope)` pairs in delivery order.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(UserId, ServerEnvelope)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered to `user`, oldest first.
    pub fn for_user(&self, user: UserId) -> Vec<ServerEnvelope> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UpdateNotifier for RecordingNotifier {
    fn notify(&self, user: UserId, update: &ServerEnvelope) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((user, update.clone()));
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_per_user_in_order() {
        let notifier = RecordingNotifier::new();
        assert!(notifier.is_empty());
        notifier.notify(UserId(1), &ServerEnvelope::Pong { time: 1 });
        notifier.notify(UserId(2), &ServerEnvelope::Pong { time: 2 });
        notifier.notify(UserId(1), &ServerEnvelope::Pong { time: 3 });

        assert_eq!(
            notifier.for_user(UserId(1)),
            vec![ServerEnvelope::Pong { time: 1 }, ServerEnvelope::Pong { time: 3 }]
        );
        assert_eq!(notifier.len(), 3);
    }
}
