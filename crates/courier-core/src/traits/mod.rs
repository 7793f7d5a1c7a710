// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits.
//!
//! Backends extend [`PluginAdapter`] and use `#[async_trait]` for dynamic
//! dispatch compatibility.

pub mod adapter;
pub mod lookup;
pub mod notify;
pub mod store;

pub use adapter::PluginAdapter;
pub use lookup::{CallLookup, IdentityResolver};
pub use notify::{NoopNotifier, UpdateNotifier};
pub use store::ConversationStore;
