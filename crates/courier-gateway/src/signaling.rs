// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call-signaling relay between the two participants of a call.

use courier_core::{CallId, CallLookup, ServerEnvelope, UserId};
use courier_hub::Hub;
use tracing::{debug, warn};

/// Result of one relay attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Handed to the hub; `delivered` sessions of the peer accepted it.
    Relayed { peer: UserId, delivered: usize },
    CallNotFound,
    /// The sender is neither caller nor callee.
    NotAuthorized,
    /// The call lookup itself failed.
    LookupFailed,
}

impl RelayOutcome {
    /// Error text sent back to the requesting session, if any.
    pub fn error_reply(&self) -> Option<ServerEnvelope> {
        match self {
            Self::Relayed { .. } => None,
            Self::CallNotFound => Some(ServerEnvelope::error("call not found")),
            Self::NotAuthorized => Some(ServerEnvelope::error("not authorized")),
            Self::LookupFailed => Some(ServerEnvelope::error("call lookup failed")),
        }
    }
}

/// Authorize `from` against the call and forward `data` to the other participant.
///
/// The call snapshot is fetched fresh for every relay and never cached.
pub async fn relay_signaling(
    calls: &dyn CallLookup,
    hub: &Hub,
    from: UserId,
    call_id: CallId,
    data: String,
) -> RelayOutcome {
    let call = match calls.get(call_id).await {
        Ok(Some(call)) => call,
        Ok(None) => {
            debug!(call_id = %call_id, user_id = %from, "signaling for unknown call");
            return RelayOutcome::CallNotFound;
        }
        Err(e) => {
            warn!(call_id = %call_id, error = %e, "call lookup failed");
            return RelayOutcome::LookupFailed;
        }
    };

    let Some(peer) = call.peer_of(from) else {
        warn!(call_id = %call_id, user_id = %from, "signaling from non-participant denied");
        courier_prometheus::record_signaling_denied();
        return RelayOutcome::NotAuthorized;
    };

    let delivered = hub.send_to_user(
        peer,
        &ServerEnvelope::Signaling {
            call_id,
            from_user_id: from,
            data,
        },
    );
    courier_prometheus::record_signaling_relayed();
    debug!(call_id = %call_id, from = %from, to = %peer, delivered, "signaling relayed");
    RelayOutcome::Relayed { peer, delivered }
}
