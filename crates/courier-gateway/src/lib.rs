// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live channel and HTTP API for Courier.
//!
//! `/ws` upgrades to a [`ClientSession`] registered with the connection hub;
//! `/v1/*` exposes the message sequencer over JSON.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod session;
pub mod signaling;
pub mod ws;

pub use auth::AuthUser;
pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState, HealthState};
pub use session::{ClientSession, SessionSettings, Teardown, WRITER_GRACE};
pub use signaling::{relay_signaling, RelayOutcome};
