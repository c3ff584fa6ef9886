// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation operations: race-free upsert, party resolution, and the
//! batched summary query behind the conversation list.

use carelink_core::{
    CarelinkError, Conversation, ConversationParties, ConversationSummary, Identity,
    MessagePreview, Role,
};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;

/// Result of an upsert attempt, resolved inside one transaction.
#[derive(Debug)]
pub enum UpsertOutcome {
    /// The conversation for the pair, existing or freshly inserted.
    Upserted {
        conversation: Conversation,
        operator_id: String,
        created: bool,
    },
    /// The consumer identity does not exist.
    ConsumerMissing,
    /// The facility does not exist.
    FacilityMissing,
}

/// Idempotent create for the (consumer, facility) pair.
///
/// Relies on the UNIQUE(consumer_id, facility_id) index plus
/// `ON CONFLICT DO NOTHING`: two racing calls both land on the same row.
pub async fn upsert_conversation(
    db: &Database,
    consumer_id: &str,
    facility_id: &str,
) -> Result<UpsertOutcome, CarelinkError> {
    let consumer_id = consumer_id.to_string();
    let facility_id = facility_id.to_string();
    // Candidate id; unused when the pair already has a row.
    let candidate_id = Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let consumer_count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM identities WHERE id = ?1",
                params![consumer_id],
                |row| row.get(0),
            )?;
            if consumer_count == 0 {
                return Ok(UpsertOutcome::ConsumerMissing);
            }

            let operator_id = match tx.query_row(
                "SELECT operator_id FROM facilities WHERE id = ?1",
                params![facility_id],
                |row| row.get::<_, String>(0),
            ) {
                Ok(operator_id) => operator_id,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Ok(UpsertOutcome::FacilityMissing);
                }
                Err(e) => return Err(e),
            };

            tx.execute(
                "INSERT INTO conversations (id, consumer_id, facility_id)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (consumer_id, facility_id) DO NOTHING",
                params![candidate_id, consumer_id, facility_id],
            )?;
            let created = tx.changes() > 0;

            let conversation = tx.query_row(
                "SELECT id, consumer_id, facility_id, last_message_at, created_at, updated_at
                 FROM conversations WHERE consumer_id = ?1 AND facility_id = ?2",
                params![consumer_id, facility_id],
                |row| {
                    Ok(Conversation {
                        id: row.get(0)?,
                        consumer_id: row.get(1)?,
                        facility_id: row.get(2)?,
                        last_message_at: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )?;
            tx.commit()?;

            Ok(UpsertOutcome::Upserted {
                conversation,
                operator_id,
                created,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, CarelinkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, consumer_id, facility_id, last_message_at, created_at, updated_at
                 FROM conversations WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(Conversation {
                    id: row.get(0)?,
                    consumer_id: row.get(1)?,
                    facility_id: row.get(2)?,
                    last_message_at: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            });
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve the two party identity ids of a conversation.
pub async fn conversation_parties(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<ConversationParties>, CarelinkError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.consumer_id, c.facility_id, f.operator_id
                 FROM conversations c
                 JOIN facilities f ON f.id = c.facility_id
                 WHERE c.id = ?1",
            )?;
            let result = stmt.query_row(params![conversation_id], |row| {
                Ok(ConversationParties {
                    conversation_id: row.get(0)?,
                    consumer_id: row.get(1)?,
                    facility_id: row.get(2)?,
                    operator_id: row.get(3)?,
                })
            });
            match result {
                Ok(parties) => Ok(Some(parties)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> Result<ConversationSummary, rusqlite::Error> {
    let content: Option<String> = row.get(5)?;
    let sender_id: Option<String> = row.get(6)?;
    let last_message = match (content, sender_id) {
        (Some(content), Some(sender_id)) => Some(MessagePreview { content, sender_id }),
        _ => None,
    };
    Ok(ConversationSummary {
        conversation_id: row.get(0)?,
        consumer_id: row.get(1)?,
        facility_id: row.get(2)?,
        counterpart_name: row.get(3)?,
        last_message_at: row.get(4)?,
        last_message,
        unread_count: row.get::<_, i64>(7)? as u64,
    })
}

/// All conversations the identity is a party to, enriched for display, most
/// recently active first.
///
/// One batched query per call: counterpart name and last-message preview come
/// from joins, the unread count from a correlated subquery. No per-row
/// follow-up lookups.
pub async fn conversation_summaries(
    db: &Database,
    identity: &Identity,
) -> Result<Vec<ConversationSummary>, CarelinkError> {
    let identity_id = identity.id.clone();
    let role = identity.role;
    db.connection()
        .call(move |conn| {
            let mut summaries = Vec::new();
            match role {
                Role::Consumer => {
                    let mut stmt = conn.prepare(
                        "SELECT c.id, c.consumer_id, c.facility_id, f.name, c.last_message_at,
                                lm.content, lm.sender_id,
                                (SELECT COUNT(*) FROM messages m
                                 WHERE m.conversation_id = c.id
                                   AND m.sender_id <> ?1 AND m.is_read = 0)
                         FROM conversations c
                         JOIN facilities f ON f.id = c.facility_id
                         LEFT JOIN messages lm ON lm.rowid =
                             (SELECT m2.rowid FROM messages m2
                              WHERE m2.conversation_id = c.id
                              ORDER BY m2.created_at DESC, m2.rowid DESC LIMIT 1)
                         WHERE c.consumer_id = ?1
                         ORDER BY c.last_message_at DESC, c.rowid DESC",
                    )?;
                    let rows = stmt.query_map(params![identity_id], |row| summary_from_row(row))?;
                    for row in rows {
                        summaries.push(row?);
                    }
                }
                Role::FacilityOperator => {
                    let mut stmt = conn.prepare(
                        "SELECT c.id, c.consumer_id, c.facility_id, u.display_name,
                                c.last_message_at, lm.content, lm.sender_id,
                                (SELECT COUNT(*) FROM messages m
                                 WHERE m.conversation_id = c.id
                                   AND m.sender_id <> ?1 AND m.is_read = 0)
                         FROM conversations c
                         JOIN facilities f ON f.id = c.facility_id
                         JOIN identities u ON u.id = c.consumer_id
                         LEFT JOIN messages lm ON lm.rowid =
                             (SELECT m2.rowid FROM messages m2
                              WHERE m2.conversation_id = c.id
                              ORDER BY m2.created_at DESC, m2.rowid DESC LIMIT 1)
                         WHERE f.operator_id = ?1
                         ORDER BY c.last_message_at DESC, c.rowid DESC",
                    )?;
                    let rows = stmt.query_map(params![identity_id], |row| summary_from_row(row))?;
                    for row in rows {
                        summaries.push(row?);
                    }
                }
            }
            Ok(summaries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::parties::{create_facility, create_identity};
    use carelink_core::Facility;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        seed_parties(&db).await;
        (db, dir)
    }

    async fn seed_parties(db: &Database) {
        let consumer = Identity {
            id: "user-1".to_string(),
            role: Role::Consumer,
            display_name: "佐藤花子".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let operator = Identity {
            id: "op-1".to_string(),
            role: Role::FacilityOperator,
            display_name: "田中太郎".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        create_identity(db, &consumer).await.unwrap();
        create_identity(db, &operator).await.unwrap();
        let facility = Facility {
            id: "fac-1".to_string(),
            operator_id: "op-1".to_string(),
            name: "さくら福祉センター".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        create_facility(db, &facility).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_is_idempotent_for_the_same_pair() {
        let (db, _dir) = setup_db().await;

        let first = upsert_conversation(&db, "user-1", "fac-1").await.unwrap();
        let UpsertOutcome::Upserted {
            conversation: c1,
            created: created1,
            ..
        } = first
        else {
            panic!("expected upserted outcome");
        };
        assert!(created1);

        let second = upsert_conversation(&db, "user-1", "fac-1").await.unwrap();
        let UpsertOutcome::Upserted {
            conversation: c2,
            created: created2,
            ..
        } = second
        else {
            panic!("expected upserted outcome");
        };
        assert!(!created2);
        assert_eq!(c1.id, c2.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_reports_missing_consumer_and_facility() {
        let (db, _dir) = setup_db().await;

        let missing_consumer = upsert_conversation(&db, "ghost", "fac-1").await.unwrap();
        assert!(matches!(missing_consumer, UpsertOutcome::ConsumerMissing));

        let missing_facility = upsert_conversation(&db, "user-1", "fac-ghost").await.unwrap();
        assert!(matches!(missing_facility, UpsertOutcome::FacilityMissing));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn parties_resolve_consumer_and_operator() {
        let (db, _dir) = setup_db().await;
        let outcome = upsert_conversation(&db, "user-1", "fac-1").await.unwrap();
        let UpsertOutcome::Upserted { conversation, .. } = outcome else {
            panic!("expected upserted outcome");
        };

        let parties = conversation_parties(&db, &conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(parties.consumer_id, "user-1");
        assert_eq!(parties.operator_id, "op-1");
        assert!(parties.includes("user-1"));
        assert!(parties.includes("op-1"));
        assert!(!parties.includes("someone-else"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_conversation_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_conversation(&db, "no-such-id").await.unwrap().is_none());
        assert!(conversation_parties(&db, "no-such-id")
            .await
            .unwrap()
            .is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn summaries_show_counterpart_names_per_role() {
        let (db, _dir) = setup_db().await;
        upsert_conversation(&db, "user-1", "fac-1").await.unwrap();

        let consumer = Identity {
            id: "user-1".to_string(),
            role: Role::Consumer,
            display_name: "佐藤花子".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let consumer_view = conversation_summaries(&db, &consumer).await.unwrap();
        assert_eq!(consumer_view.len(), 1);
        assert_eq!(consumer_view[0].counterpart_name, "さくら福祉センター");
        assert!(consumer_view[0].last_message.is_none());
        assert_eq!(consumer_view[0].unread_count, 0);

        let operator = Identity {
            id: "op-1".to_string(),
            role: Role::FacilityOperator,
            display_name: "田中太郎".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let operator_view = conversation_summaries(&db, &operator).await.unwrap();
        assert_eq!(operator_view.len(), 1);
        assert_eq!(operator_view[0].counterpart_name, "佐藤花子");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn summaries_exclude_conversations_of_other_identities() {
        let (db, _dir) = setup_db().await;
        upsert_conversation(&db, "user-1", "fac-1").await.unwrap();

        let stranger = Identity {
            id: "user-2".to_string(),
            role: Role::Consumer,
            display_name: "別のユーザー".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let view = conversation_summaries(&db, &stranger).await.unwrap();
        assert!(view.is_empty());

        db.close().await.unwrap();
    }
}
