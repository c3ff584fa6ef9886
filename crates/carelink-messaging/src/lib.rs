// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation directory, message channel, and realtime refresh.
//!
//! These components compose the `ConversationStore` trait: the directory
//! resolves and lists conversations, the channel moves messages and read
//! state, and the watcher turns change events into fresh conversation-list
//! snapshots. Identity is passed explicitly into every call; nothing here
//! reads ambient session state.

pub mod channel;
pub mod directory;
pub mod watcher;

pub use channel::MessageChannel;
pub use directory::ConversationDirectory;
pub use watcher::DirectoryWatcher;
