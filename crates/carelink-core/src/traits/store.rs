// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::CarelinkError;
use crate::types::{
    Conversation, ConversationParties, ConversationSummary, Facility, HealthStatus, Identity,
    Message, ThreadMessage,
};

/// Persistence backend for conversations, messages, and the party entities
/// the messaging logic depends on.
///
/// The store owns all durability and consistency guarantees: server-assigned
/// ids and timestamps, the uniqueness constraint on (consumer_id, facility_id),
/// and atomic single-statement updates. Callers above this trait never
/// compare-and-swap.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Initializes the backend (migrations, connection setup).
    async fn initialize(&self) -> Result<(), CarelinkError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), CarelinkError>;

    /// Cheap liveness probe against the backend.
    async fn health_check(&self) -> Result<HealthStatus, CarelinkError>;

    // --- Party entities ---

    async fn create_identity(&self, identity: &Identity) -> Result<(), CarelinkError>;

    async fn get_identity(&self, id: &str) -> Result<Option<Identity>, CarelinkError>;

    async fn create_facility(&self, facility: &Facility) -> Result<(), CarelinkError>;

    async fn get_facility(&self, id: &str) -> Result<Option<Facility>, CarelinkError>;

    // --- Conversations ---

    /// Idempotent create: returns the existing conversation for the pair if
    /// one exists, otherwise inserts and returns a new one. Enforced by a
    /// unique index, not read-then-write.
    async fn upsert_conversation(
        &self,
        consumer_id: &str,
        facility_id: &str,
    ) -> Result<Conversation, CarelinkError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, CarelinkError>;

    /// Resolves the two party identity ids of a conversation.
    async fn conversation_parties(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationParties>, CarelinkError>;

    /// All conversations the identity is a party to, enriched with counterpart
    /// name, last-message preview, and unread count, descending by
    /// `last_message_at`. Single batched query; read-only.
    async fn conversation_summaries(
        &self,
        identity: &Identity,
    ) -> Result<Vec<ConversationSummary>, CarelinkError>;

    // --- Messages ---

    /// Atomically inserts a message and bumps the parent conversation's
    /// `last_message_at`/`updated_at`. Fails with `NotFound` if the
    /// conversation does not exist and `Authorization` if the sender is not a
    /// party. Content validation is the caller's responsibility.
    async fn insert_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, CarelinkError>;

    /// Returns the full thread ascending by creation time, flipping all
    /// messages not sent by `viewer_id` to read in the same transaction.
    async fn thread_messages(
        &self,
        conversation_id: &str,
        viewer_id: &str,
    ) -> Result<Vec<ThreadMessage>, CarelinkError>;

    /// Total unread messages addressed to the identity across all of its
    /// conversations. Computed on demand, never cached.
    async fn unread_count(&self, identity: &Identity) -> Result<u64, CarelinkError>;
}
