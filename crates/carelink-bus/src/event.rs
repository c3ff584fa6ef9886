// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change event payloads.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which collection changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A new conversation row was inserted.
    ConversationCreated,
    /// A new message row was inserted.
    MessageInserted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::ConversationCreated => write!(f, "conversation_created"),
            ChangeKind::MessageInserted => write!(f, "message_inserted"),
        }
    }
}

/// A single "something changed" notification.
///
/// Carries both party ids so subscriptions can scope delivery, and nothing a
/// consumer could mistake for authoritative state: no content, no timestamps
/// from the changed row. Subscribers re-query the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Unique event id, for tracing/dedup in logs.
    pub id: String,
    pub kind: ChangeKind,
    pub conversation_id: String,
    pub consumer_id: String,
    pub operator_id: String,
    /// When the event was published (not when the row was written).
    pub occurred_at: String,
}

impl ChangeEvent {
    /// Build an event for the given conversation and its two parties.
    pub fn new(
        kind: ChangeKind,
        conversation_id: &str,
        consumer_id: &str,
        operator_id: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            conversation_id: conversation_id.to_string(),
            consumer_id: consumer_id.to_string(),
            operator_id: operator_id.to_string(),
            occurred_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Whether the identity is a party to the changed conversation.
    pub fn involves(&self, identity_id: &str) -> bool {
        self.consumer_id == identity_id || self.operator_id == identity_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn involves_matches_both_parties() {
        let event = ChangeEvent::new(ChangeKind::MessageInserted, "c1", "u1", "op1");
        assert!(event.involves("u1"));
        assert!(event.involves("op1"));
        assert!(!event.involves("u2"));
    }

    #[test]
    fn events_get_unique_ids() {
        let a = ChangeEvent::new(ChangeKind::ConversationCreated, "c1", "u1", "op1");
        let b = ChangeEvent::new(ChangeKind::ConversationCreated, "c1", "u1", "op1");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn change_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ChangeKind::MessageInserted).unwrap();
        assert_eq!(json, "\"message_inserted\"");
        assert_eq!(ChangeKind::MessageInserted.to_string(), "message_inserted");
    }
}
