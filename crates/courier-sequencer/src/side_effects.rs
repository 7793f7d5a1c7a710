// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialog, unread, and pts updates that follow a committed message.
//!
//! The message row is the commit point. The follow-up writes run as a
//! resumable plan: a failed step is retried from where it stopped, so a
//! retry never bumps a counter twice.

use std::sync::Arc;
use std::time::Duration;

use courier_core::{ConversationStore, CourierError, DialogTouch, Message, Peer, UserId};
use tracing::{error, info, warn};

/// Delay before retry `attempt` (zero-based): `base * 2^attempt`, capped at 30s.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let exponential = base_ms.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(exponential.min(30_000))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Step {
    SenderDialog,
    RecipientDialog,
    RecipientUnread,
    RecipientPts,
    StampPts,
    Done,
}

/// Remaining follow-up writes for one message.
#[derive(Debug, Clone)]
pub struct SideEffectPlan {
    message: Message,
    next: Step,
    recipient_pts: Option<i64>,
}

impl SideEffectPlan {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            next: Step::SenderDialog,
            recipient_pts: None,
        }
    }

    /// The other user of a direct conversation, if any.
    pub fn recipient(&self) -> Option<UserId> {
        let peer = self.message.peer();
        (peer.is_direct() && peer.id != self.message.from_id.0).then_some(UserId(peer.id))
    }

    /// The recipient's new pts once it has been allocated.
    pub fn recipient_pts(&self) -> Option<i64> {
        self.recipient_pts
    }

    pub fn is_done(&self) -> bool {
        self.next == Step::Done
    }

    pub fn message_id(&self) -> i64 {
        self.message.id
    }

    fn touch(&self, owner: UserId, peer: Peer, pts: Option<i64>) -> DialogTouch {
        DialogTouch {
            owner_id: owner,
            peer,
            top_message_id: self.message.position(),
            date: self.message.date,
            pts,
        }
    }

    /// Run the remaining steps; on error the plan stays at the failed step.
    pub async fn run(&mut self, store: &dyn ConversationStore) -> Result<(), CourierError> {
        let sender = self.message.from_id;
        while self.next != Step::Done {
            let recipient = self.recipient();
            self.next = match (self.next, recipient) {
                (Step::SenderDialog, _) => {
                    store
                        .upsert_dialog(&self.touch(sender, self.message.peer(), None))
                        .await?;
                    if recipient.is_some() {
                        Step::RecipientDialog
                    } else {
                        Step::Done
                    }
                }
                (Step::RecipientDialog, Some(r)) => {
                    store.upsert_dialog(&self.touch(r, Peer::user(sender), None)).await?;
                    Step::RecipientUnread
                }
                (Step::RecipientUnread, Some(r)) => {
                    store
                        .increment_unread(r, Peer::user(sender), self.message.is_mentioned)
                        .await?;
                    Step::RecipientPts
                }
                (Step::RecipientPts, Some(r)) => {
                    self.recipient_pts = Some(store.increment_pts(r).await?);
                    Step::StampPts
                }
                (Step::StampPts, Some(r)) => {
                    store
                        .upsert_dialog(&self.touch(r, Peer::user(sender), self.recipient_pts))
                        .await?;
                    Step::Done
                }
                _ => Step::Done,
            };
        }
        Ok(())
    }
}

/// Finish `plan` in the background, retrying with exponential backoff.
///
/// Exhausting `retries` logs at error level and counts the failure.
pub fn spawn_retry(
    store: Arc<dyn ConversationStore>,
    mut plan: SideEffectPlan,
    retries: u32,
    base_ms: u64,
) -> tokio::task::JoinHandle<bool> {
    tokio::spawn(async move {
        for attempt in 0..retries {
            tokio::time::sleep(backoff_delay(attempt, base_ms)).await;
            match plan.run(store.as_ref()).await {
                Ok(()) => {
                    info!(message_id = plan.message_id(), attempt = attempt + 1, "side effects recovered");
                    return true;
                }
                Err(e) => {
                    warn!(message_id = plan.message_id(), attempt = attempt + 1, error = %e, "side effect retry failed");
                }
            }
        }
        error!(message_id = plan.message_id(), retries, "side effects abandoned; dialog state needs reconciliation");
        courier_prometheus::record_side_effects_failed();
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(0, 200), Duration::from_millis(200));
        assert_eq!(backoff_delay(1, 200), Duration::from_millis(400));
        assert_eq!(backoff_delay(3, 200), Duration::from_millis(1600));
        assert_eq!(backoff_delay(40, 200), Duration::from_secs(30));
    }
}
