// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection hub for Courier.
//!
//! Tracks every live session per user and fans serialized envelopes out to
//! them without ever blocking the caller.

pub mod handle;
pub mod hub;

pub use handle::SessionHandle;
pub use hub::Hub;
