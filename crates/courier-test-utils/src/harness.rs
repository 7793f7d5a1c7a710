// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a SQLite store in a temp directory, a connection
//! hub, and a sequencer that notifies through that hub.

use std::sync::Arc;

use courier_config::model::{SequencerConfig, StorageConfig};
use courier_core::{CallInfo, CourierError, UserId};
use courier_hub::Hub;
use courier_sequencer::Sequencer;
use courier_storage::SqliteStore;

use crate::mock_lookup::{MockCallLookup, MockIdentityResolver};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    tokens: Vec<(String, UserId)>,
    calls: Vec<CallInfo>,
    sequencer: SequencerConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            calls: Vec::new(),
            sequencer: SequencerConfig::default(),
        }
    }

    /// Register a credential the mock resolver accepts.
    pub fn with_token(mut self, token: &str, user: UserId) -> Self {
        self.tokens.push((token.to_string(), user));
        self
    }

    /// Register a call the mock lookup returns.
    pub fn with_call(mut self, call: CallInfo) -> Self {
        self.calls.push(call);
        self
    }

    pub fn with_sequencer_config(mut self, config: SequencerConfig) -> Self {
        self.sequencer = config;
        self
    }

    /// Build the harness, creating and migrating the temp database.
    pub async fn build(self) -> Result<TestHarness, CourierError> {
        let temp_dir = tempfile::TempDir::new().map_err(CourierError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let store = Arc::new(SqliteStore::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        }));
        store.initialize().await?;

        let hub = Arc::new(Hub::new());
        let sequencer = Arc::new(Sequencer::new(store.clone(), hub.clone(), self.sequencer));

        let identity = Arc::new(MockIdentityResolver::with_tokens(
            self.tokens.iter().map(|(t, u)| (t.as_str(), *u)),
        ));
        let calls = Arc::new(MockCallLookup::with_calls(self.calls));

        Ok(TestHarness {
            store,
            hub,
            sequencer,
            identity,
            calls,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock lookups and temp storage.
pub struct TestHarness {
    /// SQLite store (temp DB, removed on drop).
    pub store: Arc<SqliteStore>,
    pub hub: Arc<Hub>,
    pub sequencer: Arc<Sequencer>,
    pub identity: Arc<MockIdentityResolver>,
    pub calls: Arc<MockCallLookup>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with no tokens and no calls.
    pub async fn new() -> Result<Self, CourierError> {
        Self::builder().build().await
    }
}

#[cfg(test)]
mod tests {
    use courier_core::{Peer, PluginAdapter};
    use courier_sequencer::SendMessage;

    use super::*;

    #[tokio::test]
    async fn harness_sequencer_persists_and_notifies_hub() {
        let harness = TestHarness::new().await.unwrap();
        let (handle, mut rx) = courier_hub::SessionHandle::new(UserId(2), 8);
        harness.hub.register(handle);

        let sent = harness
            .sequencer
            .send(SendMessage::text(UserId(1), Peer::user(UserId(2)), "hello"))
            .await
            .unwrap();
        assert_eq!(sent.stream_message_id, 1);
        assert!(rx.recv().await.unwrap().contains("new_message"));
        assert_eq!(
            harness.store.health_check().await.unwrap(),
            courier_core::HealthStatus::Healthy
        );
    }
}
