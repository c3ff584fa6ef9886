// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message channel: thread fetch with read consumption, sends, unread totals.

use std::sync::Arc;

use carelink_core::{CarelinkError, ConversationStore, Identity, Message, ThreadMessage};
use tracing::debug;

/// Moves messages and read state for one conversation at a time.
#[derive(Clone)]
pub struct MessageChannel {
    store: Arc<dyn ConversationStore>,
}

impl MessageChannel {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// The conversation's messages ascending by creation time, each enriched
    /// with the sender's display name and role.
    ///
    /// Viewing consumes unread state: every message not sent by the viewer is
    /// flipped to read in the same store transaction, so the rows returned
    /// already reflect the flip. "Read" means "the counterpart's messages
    /// were displayed to me".
    ///
    /// A nonexistent conversation is an error, not an empty thread, and the
    /// viewer must be one of the two parties.
    pub async fn fetch_messages(
        &self,
        conversation_id: &str,
        viewer: &Identity,
    ) -> Result<Vec<ThreadMessage>, CarelinkError> {
        let parties = self
            .store
            .conversation_parties(conversation_id)
            .await?
            .ok_or_else(|| CarelinkError::NotFound {
                entity: "conversation",
                id: conversation_id.to_string(),
            })?;
        if !parties.includes(&viewer.id) {
            return Err(CarelinkError::Authorization(format!(
                "identity `{}` is not a party to conversation `{conversation_id}`",
                viewer.id
            )));
        }

        let thread = self
            .store
            .thread_messages(conversation_id, &viewer.id)
            .await?;
        debug!(
            conversation_id,
            viewer_id = %viewer.id,
            count = thread.len(),
            "fetched thread"
        );
        Ok(thread)
    }

    /// Append a message to the conversation.
    ///
    /// Content is trimmed and must be non-empty; validation happens before
    /// any store call, so a rejected send leaves no trace. Party and
    /// existence checks run inside the store's insert transaction. The
    /// returned message carries the store-assigned id and timestamp.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, CarelinkError> {
        if conversation_id.trim().is_empty() {
            return Err(CarelinkError::Validation(
                "conversation_id must not be empty".to_string(),
            ));
        }
        if sender_id.trim().is_empty() {
            return Err(CarelinkError::Validation(
                "sender_id must not be empty".to_string(),
            ));
        }
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(CarelinkError::Validation(
                "message content must not be empty".to_string(),
            ));
        }

        let message = self
            .store
            .insert_message(conversation_id, sender_id, trimmed)
            .await?;
        debug!(
            conversation_id,
            sender_id,
            message_id = %message.id,
            "message sent"
        );
        Ok(message)
    }

    /// Total unread messages addressed to the identity across all of its
    /// conversations. Computed on demand from the store, never cached.
    pub async fn get_unread_count(&self, identity: &Identity) -> Result<u64, CarelinkError> {
        self.store.unread_count(identity).await
    }
}
