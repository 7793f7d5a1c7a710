// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod calls;
pub mod counters;
pub mod dialogs;
pub mod messages;
pub mod tokens;
