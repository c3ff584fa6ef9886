// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation directory: resolve-or-create and the visible conversation
//! list.

use std::sync::Arc;

use carelink_core::{CarelinkError, ConversationStore, ConversationSummary, Identity, Role};
use tracing::debug;

/// Resolves the single conversation between a consumer and a facility, and
/// lists all conversations visible to an identity.
///
/// Holds only a store handle; cloning is cheap and the clone shares the store.
#[derive(Clone)]
pub struct ConversationDirectory {
    store: Arc<dyn ConversationStore>,
}

impl ConversationDirectory {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// All conversations the identity is a party to, most recently active
    /// first, each enriched with counterpart name, last-message preview, and
    /// unread count.
    ///
    /// Read-only; on a transient store failure the caller keeps whatever list
    /// it already rendered and may retry.
    pub async fn list_conversations(
        &self,
        identity: &Identity,
    ) -> Result<Vec<ConversationSummary>, CarelinkError> {
        let summaries = self.store.conversation_summaries(identity).await?;
        debug!(
            identity_id = %identity.id,
            count = summaries.len(),
            "listed conversations"
        );
        Ok(summaries)
    }

    /// Return the id of the conversation between the consumer and the
    /// facility, creating it if this is the first contact.
    ///
    /// Idempotent: the same pair always yields the same id. Uniqueness is
    /// enforced by the store's unique index, so concurrent first contacts
    /// cannot create duplicates.
    pub async fn get_or_create_conversation(
        &self,
        consumer_id: &str,
        facility_id: &str,
    ) -> Result<String, CarelinkError> {
        if consumer_id.trim().is_empty() {
            return Err(CarelinkError::Validation(
                "consumer_id must not be empty".to_string(),
            ));
        }
        if facility_id.trim().is_empty() {
            return Err(CarelinkError::Validation(
                "facility_id must not be empty".to_string(),
            ));
        }

        let consumer = self
            .store
            .get_identity(consumer_id)
            .await?
            .ok_or_else(|| CarelinkError::NotFound {
                entity: "identity",
                id: consumer_id.to_string(),
            })?;
        if consumer.role != Role::Consumer {
            return Err(CarelinkError::Validation(format!(
                "identity `{consumer_id}` has role `{}`, expected `consumer`",
                consumer.role
            )));
        }

        // Facility existence is checked by the store inside the upsert.
        let conversation = self
            .store
            .upsert_conversation(consumer_id, facility_id)
            .await?;
        debug!(
            conversation_id = %conversation.id,
            consumer_id,
            facility_id,
            "resolved conversation"
        );
        Ok(conversation.id)
    }
}
