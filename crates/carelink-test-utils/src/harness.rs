// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness assembling a temp-db store with seeded parties.
//!
//! `TestHarness::new()` builds an initialized [`SqliteStore`] over a temporary
//! database, wires it to a fresh [`EventBus`], and seeds one consumer, one
//! facility operator, and one facility. Extra fixtures can be added through
//! the helper methods.

use std::sync::Arc;

use carelink_bus::EventBus;
use carelink_config::model::StorageConfig;
use carelink_core::{CarelinkError, ConversationStore, Facility, Identity, Role};
use carelink_storage::SqliteStore;
use tempfile::TempDir;

/// Timestamp used for all seeded fixtures.
pub const SEED_TIMESTAMP: &str = "2026-01-01T00:00:00.000Z";

/// A complete store-plus-bus environment over a temporary database.
///
/// The temp directory is dropped (and the database deleted) with the harness.
pub struct TestHarness {
    pub store: Arc<SqliteStore>,
    pub bus: EventBus,
    pub consumer: Identity,
    pub operator: Identity,
    pub facility: Facility,
    _temp_dir: TempDir,
}

impl TestHarness {
    /// Build a harness with the default seeded parties.
    pub async fn new() -> Result<Self, CarelinkError> {
        let temp_dir =
            TempDir::new().map_err(|e| CarelinkError::Storage { source: Box::new(e) })?;
        let db_path = temp_dir.path().join("test.db");

        let bus = EventBus::new(64);
        let store = SqliteStore::new(
            StorageConfig {
                database_path: db_path.to_string_lossy().into_owned(),
                wal_mode: true,
            },
            bus.clone(),
        );
        store.initialize().await?;

        let consumer = Identity {
            id: "user-1".to_string(),
            role: Role::Consumer,
            display_name: "佐藤花子".to_string(),
            created_at: SEED_TIMESTAMP.to_string(),
        };
        let operator = Identity {
            id: "op-1".to_string(),
            role: Role::FacilityOperator,
            display_name: "田中太郎".to_string(),
            created_at: SEED_TIMESTAMP.to_string(),
        };
        store.create_identity(&consumer).await?;
        store.create_identity(&operator).await?;

        let facility = Facility {
            id: "fac-1".to_string(),
            operator_id: operator.id.clone(),
            name: "さくら福祉センター".to_string(),
            created_at: SEED_TIMESTAMP.to_string(),
        };
        store.create_facility(&facility).await?;

        Ok(Self {
            store: Arc::new(store),
            bus,
            consumer,
            operator,
            facility,
            _temp_dir: temp_dir,
        })
    }

    /// Seed an additional consumer identity.
    pub async fn add_consumer(&self, id: &str, name: &str) -> Result<Identity, CarelinkError> {
        let identity = Identity {
            id: id.to_string(),
            role: Role::Consumer,
            display_name: name.to_string(),
            created_at: SEED_TIMESTAMP.to_string(),
        };
        self.store.create_identity(&identity).await?;
        Ok(identity)
    }

    /// Seed an additional operator identity plus a facility it runs.
    pub async fn add_facility(
        &self,
        operator_id: &str,
        operator_name: &str,
        facility_id: &str,
        facility_name: &str,
    ) -> Result<(Identity, Facility), CarelinkError> {
        let operator = Identity {
            id: operator_id.to_string(),
            role: Role::FacilityOperator,
            display_name: operator_name.to_string(),
            created_at: SEED_TIMESTAMP.to_string(),
        };
        self.store.create_identity(&operator).await?;
        let facility = Facility {
            id: facility_id.to_string(),
            operator_id: operator.id.clone(),
            name: facility_name.to_string(),
            created_at: SEED_TIMESTAMP.to_string(),
        };
        self.store.create_facility(&facility).await?;
        Ok((operator, facility))
    }

    /// The store as a trait object, the way messaging components consume it.
    pub fn store_handle(&self) -> Arc<dyn ConversationStore> {
        self.store.clone()
    }
}
