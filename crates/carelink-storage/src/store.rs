// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ConversationStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use carelink_bus::{ChangeEvent, ChangeKind, EventBus};
use carelink_config::model::StorageConfig;
use carelink_core::{
    CarelinkError, Conversation, ConversationParties, ConversationSummary, ConversationStore,
    Facility, HealthStatus, Identity, Message, ThreadMessage,
};

use crate::database::Database;
use crate::queries;
use crate::queries::conversations::UpsertOutcome;
use crate::queries::messages::SendOutcome;

/// SQLite-backed conversation store.
///
/// Wraps a [`Database`] handle, delegates queries to the typed query modules,
/// and publishes a change event on every successful conversation/message
/// insert. The database is lazily initialized on the first call to
/// [`ConversationStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    bus: EventBus,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig, bus: EventBus) -> Self {
        Self {
            config,
            bus,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, CarelinkError> {
        self.db.get().ok_or_else(|| CarelinkError::Storage {
            source: "store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn initialize(&self) -> Result<(), CarelinkError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CarelinkError::Storage {
            source: "store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), CarelinkError> {
        let db = self.db()?;
        // Checkpoint WAL; the connection itself closes when the store drops.
        db.connection()
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, CarelinkError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    // --- Party entities ---

    async fn create_identity(&self, identity: &Identity) -> Result<(), CarelinkError> {
        queries::parties::create_identity(self.db()?, identity).await
    }

    async fn get_identity(&self, id: &str) -> Result<Option<Identity>, CarelinkError> {
        queries::parties::get_identity(self.db()?, id).await
    }

    async fn create_facility(&self, facility: &Facility) -> Result<(), CarelinkError> {
        queries::parties::create_facility(self.db()?, facility).await
    }

    async fn get_facility(&self, id: &str) -> Result<Option<Facility>, CarelinkError> {
        queries::parties::get_facility(self.db()?, id).await
    }

    // --- Conversations ---

    async fn upsert_conversation(
        &self,
        consumer_id: &str,
        facility_id: &str,
    ) -> Result<Conversation, CarelinkError> {
        let outcome =
            queries::conversations::upsert_conversation(self.db()?, consumer_id, facility_id)
                .await?;
        match outcome {
            UpsertOutcome::Upserted {
                conversation,
                operator_id,
                created,
            } => {
                if created {
                    self.bus.publish(ChangeEvent::new(
                        ChangeKind::ConversationCreated,
                        &conversation.id,
                        &conversation.consumer_id,
                        &operator_id,
                    ));
                }
                Ok(conversation)
            }
            UpsertOutcome::ConsumerMissing => Err(CarelinkError::NotFound {
                entity: "identity",
                id: consumer_id.to_string(),
            }),
            UpsertOutcome::FacilityMissing => Err(CarelinkError::NotFound {
                entity: "facility",
                id: facility_id.to_string(),
            }),
        }
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, CarelinkError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn conversation_parties(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationParties>, CarelinkError> {
        queries::conversations::conversation_parties(self.db()?, conversation_id).await
    }

    async fn conversation_summaries(
        &self,
        identity: &Identity,
    ) -> Result<Vec<ConversationSummary>, CarelinkError> {
        queries::conversations::conversation_summaries(self.db()?, identity).await
    }

    // --- Messages ---

    async fn insert_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, CarelinkError> {
        let outcome =
            queries::messages::insert_message(self.db()?, conversation_id, sender_id, content)
                .await?;
        match outcome {
            SendOutcome::Sent {
                message,
                consumer_id,
                operator_id,
            } => {
                self.bus.publish(ChangeEvent::new(
                    ChangeKind::MessageInserted,
                    conversation_id,
                    &consumer_id,
                    &operator_id,
                ));
                Ok(message)
            }
            SendOutcome::ConversationMissing => Err(CarelinkError::NotFound {
                entity: "conversation",
                id: conversation_id.to_string(),
            }),
            SendOutcome::NotParty => Err(CarelinkError::Authorization(format!(
                "identity `{sender_id}` is not a party to conversation `{conversation_id}`"
            ))),
        }
    }

    async fn thread_messages(
        &self,
        conversation_id: &str,
        viewer_id: &str,
    ) -> Result<Vec<ThreadMessage>, CarelinkError> {
        queries::messages::thread_messages(self.db()?, conversation_id, viewer_id).await
    }

    async fn unread_count(&self, identity: &Identity) -> Result<u64, CarelinkError> {
        queries::messages::unread_count(self.db()?, identity).await
    }
}
