// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for pluggable backends.

pub mod store;

pub use store::ConversationStore;
