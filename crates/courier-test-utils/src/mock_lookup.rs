// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory call and identity lookups.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use courier_core::{
    CallId, CallInfo, CallLookup, CourierError, IdentityResolver, PluginAdapter, UserId,
    UserIdentity,
};

/// Serves call snapshots from a map. Can be switched into a failing mode.
#[derive(Default)]
pub struct MockCallLookup {
    calls: RwLock<HashMap<CallId, CallInfo>>,
    failing: AtomicBool,
    lookups: AtomicUsize,
}

impl MockCallLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calls(calls: impl IntoIterator<Item = CallInfo>) -> Self {
        let map = calls.into_iter().map(|c| (c.call_id, c)).collect();
        Self {
            calls: RwLock::new(map),
            ..Self::default()
        }
    }

    /// Add or replace a call.
    pub async fn insert(&self, call: CallInfo) {
        self.calls.write().await.insert(call.call_id, call);
    }

    pub async fn remove(&self, call_id: CallId) {
        self.calls.write().await.remove(&call_id);
    }

    /// Make every subsequent lookup return a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// How many times [`CallLookup::get`] was called.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MockCallLookup {
    fn name(&self) -> &str {
        "mock-calls"
    }
}

#[async_trait]
impl CallLookup for MockCallLookup {
    async fn get(&self, call_id: CallId) -> Result<Option<CallInfo>, CourierError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CourierError::Storage {
                source: "mock call lookup failure".into(),
            });
        }
        Ok(self.calls.read().await.get(&call_id).cloned())
    }
}

/// Resolves a fixed set of tokens.
#[derive(Default)]
pub struct MockIdentityResolver {
    tokens: RwLock<HashMap<String, UserId>>,
}

impl MockIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens<'a>(tokens: impl IntoIterator<Item = (&'a str, UserId)>) -> Self {
        let map = tokens
            .into_iter()
            .map(|(token, user)| (token.to_string(), user))
            .collect();
        Self {
            tokens: RwLock::new(map),
        }
    }

    pub async fn insert(&self, token: &str, user: UserId) {
        self.tokens.write().await.insert(token.to_string(), user);
    }
}

#[async_trait]
impl PluginAdapter for MockIdentityResolver {
    fn name(&self) -> &str {
        "mock-identity"
    }
}

#[async_trait]
impl IdentityResolver for MockIdentityResolver {
    async fn resolve(&self, credential: &str) -> Result<Option<UserIdentity>, CourierError> {
        Ok(self
            .tokens
            .read()
            .await
            .get(credential)
            .map(|&user_id| UserIdentity { user_id }))
    }
}

#[cfg(test)]
mod tests {
    use courier_core::CallState;

    use super::*;

    fn call(id: i64) -> CallInfo {
        CallInfo {
            call_id: CallId(id),
            caller_id: UserId(1),
            callee_id: UserId(2),
            state: CallState::Ringing,
        }
    }

    #[tokio::test]
    async fn call_lookup_serves_inserted_calls() {
        let lookup = MockCallLookup::with_calls([call(1)]);
        assert_eq!(lookup.get(CallId(1)).await.unwrap(), Some(call(1)));
        assert_eq!(lookup.get(CallId(2)).await.unwrap(), None);

        lookup.insert(call(2)).await;
        assert!(lookup.get(CallId(2)).await.unwrap().is_some());
        assert_eq!(lookup.lookup_count(), 3);
    }

    #[tokio::test]
    async fn call_lookup_failing_mode() {
        let lookup = MockCallLookup::with_calls([call(1)]);
        lookup.set_failing(true);
        assert!(lookup.get(CallId(1)).await.unwrap_err().is_storage());
    }

    #[tokio::test]
    async fn identity_resolver_known_and_unknown() {
        let resolver = MockIdentityResolver::with_tokens([("t1", UserId(9))]);
        assert_eq!(
            resolver.resolve("t1").await.unwrap(),
            Some(UserIdentity { user_id: UserId(9) })
        );
        assert_eq!(resolver.resolve("nope").await.unwrap(), None);
    }
}
