// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot administrative subcommands operating on the local database.

use courier_config::CourierConfig;
use courier_core::{CallId, CallState, CourierError, PluginAdapter, UserId};
use courier_storage::SqliteStore;

/// Open the store, running migrations.
async fn open_store(config: &CourierConfig) -> Result<SqliteStore, CourierError> {
    let store = SqliteStore::new(config.storage.clone());
    store.initialize().await?;
    Ok(store)
}

/// Close `store`, preferring the operation's own error over a close failure.
async fn finish<T>(store: SqliteStore, result: Result<T, CourierError>) -> Result<T, CourierError> {
    let closed = store.shutdown().await;
    let value = result?;
    closed?;
    Ok(value)
}

pub async fn run_migrate(config: &CourierConfig) -> Result<(), CourierError> {
    let store = open_store(config).await?;
    finish(store, Ok(())).await?;
    println!("migrations applied to {}", config.storage.database_path);
    Ok(())
}

pub fn print_config(config: &CourierConfig) -> Result<(), CourierError> {
    let rendered =
        toml::to_string_pretty(config).map_err(|e| CourierError::Config(e.to_string()))?;
    print!("{rendered}");
    Ok(())
}

pub async fn issue_token(
    config: &CourierConfig,
    user: i64,
    ttl_secs: Option<i64>,
    token: Option<String>,
) -> Result<(), CourierError> {
    if ttl_secs.is_some_and(|t| t <= 0) {
        return Err(CourierError::Validation("ttl must be positive".into()));
    }
    let token = token.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let store = open_store(config).await?;
    let result = store.issue_token(&token, UserId(user), ttl_secs).await;
    finish(store, result).await?;
    println!("{token}");
    Ok(())
}

pub async fn revoke_token(config: &CourierConfig, token: &str) -> Result<(), CourierError> {
    let store = open_store(config).await?;
    let result = store.revoke_token(token).await;
    if !finish(store, result).await? {
        return Err(CourierError::not_found("token", "<redacted>"));
    }
    println!("token revoked");
    Ok(())
}

pub async fn create_call(config: &CourierConfig, caller: i64, callee: i64) -> Result<(), CourierError> {
    if caller == callee {
        return Err(CourierError::Validation("caller and callee must differ".into()));
    }
    let store = open_store(config).await?;
    let result = store.create_call(UserId(caller), UserId(callee)).await;
    let call = finish(store, result).await?;
    println!("{}", call.call_id);
    Ok(())
}

pub async fn end_call(config: &CourierConfig, call_id: i64) -> Result<(), CourierError> {
    let store = open_store(config).await?;
    let result = store.set_call_state(CallId(call_id), CallState::Ended).await;
    if !finish(store, result).await? {
        return Err(CourierError::not_found("call", call_id));
    }
    println!("call {call_id} ended");
    Ok(())
}
