// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live update delivery used by the sequencer.

use crate::envelope::ServerEnvelope;
use crate::types::UserId;

/// Best-effort delivery of an envelope to every live connection of a user.
///
/// Must never block; returns how many connections accepted the envelope.
pub trait UpdateNotifier: Send + Sync + 'static {
    fn notify(&self, user: UserId, update: &ServerEnvelope) -> usize;
}

/// Discards every update. Used when no live channel is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl UpdateNotifier for NoopNotifier {
    fn notify(&self, _user: UserId, _update: &ServerEnvelope) -> usize {
        0
    }
}
