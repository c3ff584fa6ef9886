// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations: atomic send, thread fetch with read-flip, unread
//! counts.
//!
//! Ids are UUIDv4 and timestamps come from SQLite's clock, so ordering is
//! authoritative at the store regardless of client clocks.

use carelink_core::{CarelinkError, Identity, Message, Role, ThreadMessage};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::queries::parties::role_from_row;

/// Result of a send attempt, resolved inside one transaction.
///
/// Party ids ride along so the caller can publish a scoped change event
/// without a second lookup.
#[derive(Debug)]
pub enum SendOutcome {
    Sent {
        message: Message,
        consumer_id: String,
        operator_id: String,
    },
    ConversationMissing,
    NotParty,
}

/// Insert a message and bump the parent conversation's `last_message_at` and
/// `updated_at`, all in one transaction.
///
/// The party check happens here, inside the transaction, so an unauthorized
/// sender can never leave a row behind. Content validation (non-empty after
/// trimming) is the messaging layer's responsibility.
pub async fn insert_message(
    db: &Database,
    conversation_id: &str,
    sender_id: &str,
    content: &str,
) -> Result<SendOutcome, CarelinkError> {
    let conversation_id = conversation_id.to_string();
    let sender_id = sender_id.to_string();
    let content = content.to_string();
    let message_id = Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let parties = tx.query_row(
                "SELECT c.consumer_id, f.operator_id
                 FROM conversations c
                 JOIN facilities f ON f.id = c.facility_id
                 WHERE c.id = ?1",
                params![conversation_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            );
            let (consumer_id, operator_id) = match parties {
                Ok(pair) => pair,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Ok(SendOutcome::ConversationMissing);
                }
                Err(e) => return Err(e),
            };
            if sender_id != consumer_id && sender_id != operator_id {
                return Ok(SendOutcome::NotParty);
            }

            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, content)
                 VALUES (?1, ?2, ?3, ?4)",
                params![message_id, conversation_id, sender_id, content],
            )?;
            let message = tx.query_row(
                "SELECT id, conversation_id, sender_id, content, is_read, created_at
                 FROM messages WHERE id = ?1",
                params![message_id],
                |row| {
                    Ok(Message {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        content: row.get(3)?,
                        is_read: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )?;

            // MAX keeps last_message_at monotonically non-decreasing even if
            // the wall clock steps backwards between inserts.
            tx.execute(
                "UPDATE conversations
                 SET last_message_at = MAX(last_message_at, ?1), updated_at = ?1
                 WHERE id = ?2",
                params![message.created_at, conversation_id],
            )?;
            tx.commit()?;

            Ok(SendOutcome::Sent {
                message,
                consumer_id,
                operator_id,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch the full thread ascending by creation time (rowid breaks ties),
/// flipping every message not sent by the viewer to read first, in the same
/// transaction.
///
/// Returned rows therefore already show `is_read = true` for the
/// counterpart's messages. Existence and party checks belong to the caller.
pub async fn thread_messages(
    db: &Database,
    conversation_id: &str,
    viewer_id: &str,
) -> Result<Vec<ThreadMessage>, CarelinkError> {
    let conversation_id = conversation_id.to_string();
    let viewer_id = viewer_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "UPDATE messages SET is_read = 1
                 WHERE conversation_id = ?1 AND sender_id <> ?2 AND is_read = 0",
                params![conversation_id, viewer_id],
            )?;

            let mut thread = Vec::new();
            {
                let mut stmt = tx.prepare(
                    "SELECT m.id, m.conversation_id, m.sender_id, m.content, m.is_read,
                            m.created_at, i.display_name, i.role
                     FROM messages m
                     JOIN identities i ON i.id = m.sender_id
                     WHERE m.conversation_id = ?1
                     ORDER BY m.created_at ASC, m.rowid ASC",
                )?;
                let rows = stmt.query_map(params![conversation_id], |row| {
                    Ok(ThreadMessage {
                        message: Message {
                            id: row.get(0)?,
                            conversation_id: row.get(1)?,
                            sender_id: row.get(2)?,
                            content: row.get(3)?,
                            is_read: row.get(4)?,
                            created_at: row.get(5)?,
                        },
                        sender_name: row.get(6)?,
                        sender_role: role_from_row(7, row.get(7)?)?,
                    })
                })?;
                for row in rows {
                    thread.push(row?);
                }
            }
            tx.commit()?;

            Ok(thread)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Total unread messages addressed to the identity across all of its
/// conversations.
pub async fn unread_count(db: &Database, identity: &Identity) -> Result<u64, CarelinkError> {
    let identity_id = identity.id.clone();
    let role = identity.role;
    db.connection()
        .call(move |conn| {
            let count: i64 = match role {
                Role::Consumer => conn.query_row(
                    "SELECT COUNT(*)
                     FROM messages m
                     JOIN conversations c ON c.id = m.conversation_id
                     WHERE c.consumer_id = ?1 AND m.sender_id <> ?1 AND m.is_read = 0",
                    params![identity_id],
                    |row| row.get(0),
                )?,
                Role::FacilityOperator => conn.query_row(
                    "SELECT COUNT(*)
                     FROM messages m
                     JOIN conversations c ON c.id = m.conversation_id
                     JOIN facilities f ON f.id = c.facility_id
                     WHERE f.operator_id = ?1 AND m.sender_id <> ?1 AND m.is_read = 0",
                    params![identity_id],
                    |row| row.get(0),
                )?,
            };
            Ok(count as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::{upsert_conversation, UpsertOutcome};
    use crate::queries::parties::{create_facility, create_identity};
    use carelink_core::Facility;
    use tempfile::tempdir;

    async fn setup_db_with_conversation() -> (Database, String, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let consumer = consumer_identity();
        let operator = operator_identity();
        create_identity(&db, &consumer).await.unwrap();
        create_identity(&db, &operator).await.unwrap();
        create_facility(
            &db,
            &Facility {
                id: "fac-1".to_string(),
                operator_id: "op-1".to_string(),
                name: "さくら福祉センター".to_string(),
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();

        let outcome = upsert_conversation(&db, "user-1", "fac-1").await.unwrap();
        let UpsertOutcome::Upserted { conversation, .. } = outcome else {
            panic!("expected upserted outcome");
        };
        (db, conversation.id, dir)
    }

    fn consumer_identity() -> Identity {
        Identity {
            id: "user-1".to_string(),
            role: Role::Consumer,
            display_name: "佐藤花子".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn operator_identity() -> Identity {
        Identity {
            id: "op-1".to_string(),
            role: Role::FacilityOperator,
            display_name: "田中太郎".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_server_id_and_timestamp() {
        let (db, conversation_id, _dir) = setup_db_with_conversation().await;

        let outcome = insert_message(&db, &conversation_id, "user-1", "質問があります")
            .await
            .unwrap();
        let SendOutcome::Sent { message, .. } = outcome else {
            panic!("expected sent outcome");
        };
        assert!(!message.id.is_empty());
        assert!(!message.created_at.is_empty());
        assert!(!message.is_read);
        assert_eq!(message.content, "質問があります");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn insert_bumps_last_message_at() {
        let (db, conversation_id, _dir) = setup_db_with_conversation().await;
        let before = crate::queries::conversations::get_conversation(&db, &conversation_id)
            .await
            .unwrap()
            .unwrap();

        let outcome = insert_message(&db, &conversation_id, "user-1", "hello")
            .await
            .unwrap();
        let SendOutcome::Sent { message, .. } = outcome else {
            panic!("expected sent outcome");
        };

        let after = crate::queries::conversations::get_conversation(&db, &conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert!(after.last_message_at >= before.last_message_at);
        assert_eq!(after.last_message_at, message.created_at);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn insert_into_missing_conversation_reports_outcome() {
        let (db, _conversation_id, _dir) = setup_db_with_conversation().await;
        let outcome = insert_message(&db, "no-such-conversation", "user-1", "hello")
            .await
            .unwrap();
        assert!(matches!(outcome, SendOutcome::ConversationMissing));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn insert_by_stranger_leaves_no_row() {
        let (db, conversation_id, _dir) = setup_db_with_conversation().await;

        let outcome = insert_message(&db, &conversation_id, "stranger", "hi")
            .await
            .unwrap();
        assert!(matches!(outcome, SendOutcome::NotParty));

        let thread = thread_messages(&db, &conversation_id, "user-1")
            .await
            .unwrap();
        assert!(thread.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn thread_is_ordered_and_enriched() {
        let (db, conversation_id, _dir) = setup_db_with_conversation().await;

        for content in ["first", "second", "third"] {
            insert_message(&db, &conversation_id, "user-1", content)
                .await
                .unwrap();
        }
        insert_message(&db, &conversation_id, "op-1", "reply")
            .await
            .unwrap();

        let thread = thread_messages(&db, &conversation_id, "op-1")
            .await
            .unwrap();
        assert_eq!(thread.len(), 4);
        for pair in thread.windows(2) {
            assert!(pair[0].message.created_at <= pair[1].message.created_at);
        }
        assert_eq!(thread[0].message.content, "first");
        assert_eq!(thread[0].sender_name, "佐藤花子");
        assert_eq!(thread[0].sender_role, Role::Consumer);
        assert_eq!(thread[3].sender_name, "田中太郎");
        assert_eq!(thread[3].sender_role, Role::FacilityOperator);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn viewing_flips_only_counterpart_messages() {
        let (db, conversation_id, _dir) = setup_db_with_conversation().await;

        insert_message(&db, &conversation_id, "user-1", "from consumer")
            .await
            .unwrap();
        insert_message(&db, &conversation_id, "op-1", "from operator")
            .await
            .unwrap();

        // Operator views: the consumer's message flips, the operator's own
        // (still unseen by the consumer) does not.
        let thread = thread_messages(&db, &conversation_id, "op-1")
            .await
            .unwrap();
        let consumer_msg = thread
            .iter()
            .find(|m| m.message.sender_id == "user-1")
            .unwrap();
        let operator_msg = thread
            .iter()
            .find(|m| m.message.sender_id == "op-1")
            .unwrap();
        assert!(consumer_msg.message.is_read);
        assert!(!operator_msg.message.is_read);

        assert_eq!(unread_count(&db, &operator_identity()).await.unwrap(), 0);
        assert_eq!(unread_count(&db, &consumer_identity()).await.unwrap(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unread_count_sums_across_conversations() {
        let (db, conversation_id, _dir) = setup_db_with_conversation().await;

        // A second consumer with its own conversation to the same facility.
        let other = Identity {
            id: "user-2".to_string(),
            role: Role::Consumer,
            display_name: "鈴木次郎".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        create_identity(&db, &other).await.unwrap();
        let outcome = upsert_conversation(&db, "user-2", "fac-1").await.unwrap();
        let UpsertOutcome::Upserted {
            conversation: second,
            ..
        } = outcome
        else {
            panic!("expected upserted outcome");
        };

        insert_message(&db, &conversation_id, "user-1", "one")
            .await
            .unwrap();
        insert_message(&db, &conversation_id, "user-1", "two")
            .await
            .unwrap();
        insert_message(&db, &second.id, "user-2", "three")
            .await
            .unwrap();

        assert_eq!(unread_count(&db, &operator_identity()).await.unwrap(), 3);

        // Reading one thread consumes only that thread's unread state.
        thread_messages(&db, &conversation_id, "op-1").await.unwrap();
        assert_eq!(unread_count(&db, &operator_identity()).await.unwrap(), 1);

        db.close().await.unwrap();
    }
}
