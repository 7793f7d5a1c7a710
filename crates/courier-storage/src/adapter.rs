// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the collaborator traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use courier_config::model::StorageConfig;
use courier_core::{
    unix_now, CallId, CallInfo, CallLookup, CallState, ConversationStore, CourierError, Dialog,
    DialogPrefs, DialogQuery, DialogTouch, HealthStatus, HistoryQuery, IdentityResolver, Message,
    Peer, PluginAdapter, UserId, UserIdentity,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed store for conversations, calls, and access tokens.
///
/// The database is opened lazily by [`SqliteStore::initialize`]; every
/// other call fails with a storage error until then.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), CourierError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CourierError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, CourierError> {
        self.db.get().ok_or_else(|| CourierError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Record a call so signaling between its participants can be relayed.
    pub async fn create_call(&self, caller: UserId, callee: UserId) -> Result<CallInfo, CourierError> {
        queries::calls::create_call(self.db()?, caller, callee, unix_now()).await
    }

    pub async fn set_call_state(&self, call_id: CallId, state: CallState) -> Result<bool, CourierError> {
        queries::calls::set_call_state(self.db()?, call_id, state).await
    }

    /// Bind an access token to a user. `ttl_secs` of `None` never expires.
    pub async fn issue_token(
        &self,
        token: &str,
        user: UserId,
        ttl_secs: Option<i64>,
    ) -> Result<(), CourierError> {
        let now = unix_now();
        queries::tokens::issue_token(self.db()?, token, user, now, ttl_secs.map(|t| now + t)).await
    }

    pub async fn revoke_token(&self, token: &str) -> Result<bool, CourierError> {
        queries::tokens::revoke_token(self.db()?, token).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("storage not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn next_stream_id(&self, peer: Peer) -> Result<i64, CourierError> {
        queries::counters::next_stream_id(self.db()?, peer).await
    }

    async fn release_stream_id(&self, peer: Peer, id: i64) -> Result<(), CourierError> {
        queries::counters::release_stream_id(self.db()?, peer, id).await
    }

    async fn insert_message(&self, message: &Message) -> Result<i64, CourierError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn find_by_random_key(&self, random_id: i64) -> Result<Option<Message>, CourierError> {
        queries::messages::find_by_random_key(self.db()?, random_id).await
    }

    async fn get_message(&self, id: i64) -> Result<Option<Message>, CourierError> {
        queries::messages::get_message(self.db()?, id).await
    }

    async fn upsert_dialog(&self, touch: &DialogTouch) -> Result<(), CourierError> {
        queries::dialogs::upsert_dialog(self.db()?, touch).await
    }

    async fn increment_unread(
        &self,
        owner: UserId,
        peer: Peer,
        mentioned: bool,
    ) -> Result<(), CourierError> {
        queries::dialogs::increment_unread(self.db()?, owner, peer, mentioned).await
    }

    async fn increment_pts(&self, user: UserId) -> Result<i64, CourierError> {
        queries::counters::increment_pts(self.db()?, user).await
    }

    async fn list_history(&self, query: &HistoryQuery) -> Result<Vec<Message>, CourierError> {
        queries::messages::list_history(self.db()?, query).await
    }

    async fn list_dialogs(&self, query: &DialogQuery) -> Result<Vec<Dialog>, CourierError> {
        queries::dialogs::list_dialogs(self.db()?, query).await
    }

    async fn get_dialog(&self, owner: UserId, peer: Peer) -> Result<Option<Dialog>, CourierError> {
        queries::dialogs::get_dialog(self.db()?, owner, peer).await
    }

    async fn advance_read_pointer(
        &self,
        owner: UserId,
        peer: Peer,
        max_id: i64,
    ) -> Result<bool, CourierError> {
        queries::dialogs::advance_read_pointer(self.db()?, owner, peer, max_id).await
    }

    async fn advance_outbox_pointer(
        &self,
        owner: UserId,
        peer: Peer,
        max_id: i64,
    ) -> Result<bool, CourierError> {
        queries::dialogs::advance_outbox_pointer(self.db()?, owner, peer, max_id).await
    }

    async fn delete_owned(&self, user: UserId, ids: &[i64]) -> Result<Vec<Message>, CourierError> {
        queries::messages::delete_owned(self.db()?, user, ids).await
    }

    async fn update_text(
        &self,
        user: UserId,
        id: i64,
        text: &str,
        entities: Option<serde_json::Value>,
        edit_date: i64,
    ) -> Result<Option<Message>, CourierError> {
        queries::messages::update_text(self.db()?, user, id, text, entities, edit_date).await
    }

    async fn update_dialog_prefs(
        &self,
        owner: UserId,
        peer: Peer,
        prefs: &DialogPrefs,
    ) -> Result<Option<Dialog>, CourierError> {
        queries::dialogs::update_dialog_prefs(self.db()?, owner, peer, prefs).await
    }
}

#[async_trait]
impl CallLookup for SqliteStore {
    async fn get(&self, call_id: CallId) -> Result<Option<CallInfo>, CourierError> {
        queries::calls::get_call(self.db()?, call_id).await
    }
}

#[async_trait]
impl IdentityResolver for SqliteStore {
    async fn resolve(&self, credential: &str) -> Result<Option<UserIdentity>, CourierError> {
        queries::tokens::resolve_token(self.db()?, credential, unix_now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lazy.db");
        let store = SqliteStore::new(make_config(path.to_str().unwrap()));

        assert_eq!(store.name(), "sqlite");
        assert!(!path.exists());
        let err = store.get_message(1).await.unwrap_err();
        assert!(err.is_storage());
        assert!(matches!(
            store.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn initialize_twice_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("twice.db");
        let store = SqliteStore::new(make_config(path.to_str().unwrap()));
        store.initialize().await.unwrap();
        assert!(path.exists());
        assert!(store.initialize().await.is_err());
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn lookups_resolve_calls_and_tokens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookups.db");
        let store = SqliteStore::new(make_config(path.to_str().unwrap()));
        store.initialize().await.unwrap();

        let call = store.create_call(UserId(1), UserId(2)).await.unwrap();
        let found = CallLookup::get(&store, call.call_id).await.unwrap().unwrap();
        assert_eq!(found.peer_of(UserId(1)), Some(UserId(2)));

        store.issue_token("secret", UserId(1), Some(3600)).await.unwrap();
        let who = store.resolve("secret").await.unwrap().unwrap();
        assert_eq!(who.user_id, UserId(1));
        assert!(store.resolve("nope").await.unwrap().is_none());
    }
}
