// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Carelink messaging backend.

use thiserror::Error;

/// The primary error type used across the Carelink store and messaging operations.
#[derive(Debug, Error)]
pub enum CarelinkError {
    /// A referenced entity (conversation, identity, facility) does not exist.
    #[error("not found: {entity} `{id}`")]
    NotFound { entity: &'static str, id: String },

    /// Invalid input (empty message content, missing identifiers, wrong role).
    #[error("validation error: {0}")]
    Validation(String),

    /// The acting identity is not a party to the referenced conversation.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Storage backend errors (database connection, query failure). Retryable.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CarelinkError {
    /// Whether the caller may retry the operation unchanged.
    ///
    /// Only transient store failures are retryable; validation, authorization,
    /// and not-found errors are deterministic and will fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CarelinkError::Storage { .. })
    }
}
