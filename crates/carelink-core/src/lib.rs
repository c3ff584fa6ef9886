// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Carelink messaging backend.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Carelink workspace. The SQLite store and
//! the messaging components both build on what is defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CarelinkError;
pub use traits::ConversationStore;
pub use types::{
    Conversation, ConversationParties, ConversationSummary, Facility, HealthStatus, Identity,
    Message, MessagePreview, Role, ThreadMessage,
};
