// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message sequencer and dialog state machine.
//!
//! Allocates gapless per-stream message ids, deduplicates client retries by
//! idempotency key, and keeps each user's dialog summaries consistent.

pub mod sequencer;
pub mod side_effects;

pub use sequencer::{clamp_limit, SendMessage, Sequencer, DEFAULT_LIMIT, MAX_LIMIT};
pub use side_effects::{backoff_delay, SideEffectPlan};
