// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Carelink workspace.
//!
//! All timestamps are ISO-8601 strings with millisecond precision assigned by
//! the store (`strftime('%Y-%m-%dT%H:%M:%fZ','now')`), never by the client
//! clock. ISO-8601 strings compare lexicographically in chronological order,
//! which the ordering invariants below rely on.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Role tag of an authenticated identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A consumer searching for and contacting facilities.
    Consumer,
    /// An operator managing one or more facility profiles.
    FacilityOperator,
}

/// An authenticated identity, owned by the external identity provider.
///
/// Referenced by value everywhere in this subsystem; Carelink never manages
/// the login/logout lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub role: Role,
    pub display_name: String,
    pub created_at: String,
}

/// A disability-care facility profile, owned by a facility-operator identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub operator_id: String,
    pub name: String,
    pub created_at: String,
}

/// The persistent thread between one consumer and one facility.
///
/// Exactly one conversation exists per (consumer_id, facility_id) pair;
/// `last_message_at` is monotonically non-decreasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub consumer_id: String,
    pub facility_id: String,
    pub last_message_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A single timestamped unit of text within a conversation.
///
/// `is_read` only transitions false -> true, and only when the counterpart
/// (not the sender) views the thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

/// The two identities entitled to act on a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationParties {
    pub conversation_id: String,
    pub consumer_id: String,
    pub facility_id: String,
    pub operator_id: String,
}

impl ConversationParties {
    /// Whether the given identity id is one of the two parties.
    pub fn includes(&self, identity_id: &str) -> bool {
        self.consumer_id == identity_id || self.operator_id == identity_id
    }
}

/// Preview of the most recent message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePreview {
    pub content: String,
    pub sender_id: String,
}

/// One row of the conversation list, enriched for display.
///
/// `counterpart_name` is the facility name when viewed by a consumer and the
/// consumer's display name when viewed by a facility operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub consumer_id: String,
    pub facility_id: String,
    pub counterpart_name: String,
    pub last_message: Option<MessagePreview>,
    pub last_message_at: String,
    pub unread_count: u64,
}

/// A message in a fetched thread, enriched with sender display attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub message: Message,
    pub sender_name: String,
    pub sender_role: Role,
}

/// Health status reported by store health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Store is fully operational.
    Healthy,
    /// Store is operational but experiencing issues.
    Degraded(String),
    /// Store is not operational.
    Unhealthy(String),
}
