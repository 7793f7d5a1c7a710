// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only lookups owned by the surrounding system.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CallId, CallInfo, UserIdentity};

/// Resolves a call identifier to its participants.
#[async_trait]
pub trait CallLookup: PluginAdapter {
    async fn get(&self, call_id: CallId) -> Result<Option<CallInfo>, CourierError>;
}

/// Resolves a transport credential to a user.
#[async_trait]
pub trait IdentityResolver: PluginAdapter {
    async fn resolve(&self, credential: &str) -> Result<Option<UserIdentity>, CourierError>;
}
