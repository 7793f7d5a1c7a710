// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Courier integration tests.
//!
//! Provides mock collaborators and a harness backed by a temporary SQLite
//! database, so tests run without any external service.
//!
//! # Components
//!
//! - [`MockCallLookup`] - call snapshots served from memory
//! - [`MockIdentityResolver`] - fixed credential to user table
//! - [`RecordingNotifier`] - captures every live update
//! - [`TestHarness`] - store, hub, and sequencer wired together

pub mod harness;
pub mod mock_lookup;
pub mod recording;

pub use harness::TestHarness;
pub use mock_lookup::{MockCallLookup, MockIdentityResolver};
pub use recording::RecordingNotifier;
