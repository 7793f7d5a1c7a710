// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Courier.
//!
//! Provides the shared error type, conversation domain types, the
//! live-channel envelopes, and the collaborator traits every other crate
//! programs against.

pub mod envelope;
pub mod error;
pub mod traits;
pub mod types;

pub use envelope::{ClientEnvelope, DecodeError, ServerEnvelope};
pub use error::CourierError;
pub use traits::{
    CallLookup, ConversationStore, IdentityResolver, NoopNotifier, PluginAdapter, UpdateNotifier,
};
pub use types::{
    CallId, CallInfo, CallState, Dialog, DialogPrefs, DialogQuery, DialogTouch, HealthStatus,
    HistoryQuery, MediaRef, Message, Peer, PeerType, UserId, UserIdentity,
};

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn courier_error_has_all_variants() {
        let _config = CourierError::Config("test".into());
        let _storage = CourierError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _authn = CourierError::Authentication("bad token".into());
        let _authz = CourierError::Authorization("not a participant".into());
        let _not_found = CourierError::not_found("message", 3);
        let _validation = CourierError::Validation("missing field".into());
        let _channel = CourierError::Channel {
            message: "test".into(),
            source: None,
        };
        let _timeout = CourierError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = CourierError::Internal("test".into());
    }

    #[test]
    fn noop_notifier_delivers_nothing() {
        let n = NoopNotifier;
        assert_eq!(n.notify(UserId(1), &ServerEnvelope::Pong { time: 0 }), 0);
    }

    #[test]
    fn unix_now_is_positive() {
        assert!(unix_now() > 1_600_000_000);
    }

    #[test]
    fn all_traits_are_object_safe() {
        fn _store(_: &dyn ConversationStore) {}
        fn _calls(_: &dyn CallLookup) {}
        fn _identity(_: &dyn IdentityResolver) {}
        fn _notifier(_: &dyn UpdateNotifier) {}
    }
}
