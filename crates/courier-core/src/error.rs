// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier real-time backbone.

use thiserror::Error;

/// The error type shared by every collaborator trait and core operation.
///
/// A full outbound queue is not represented here: dropped live frames are
/// counted and logged, never surfaced to a caller.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, bad values, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence failures (connection, query, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A transport credential could not be resolved to a user.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The caller is not allowed to perform the operation.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Malformed or incomplete input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Live channel or server errors (bind failure, socket error).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Shorthand for a [`CourierError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(e),
        }
    }

    /// True for failures of the persistence layer.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}
