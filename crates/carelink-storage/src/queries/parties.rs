// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and facility CRUD operations.
//!
//! Identities are owned by the external identity provider; Carelink stores a
//! projection (id, role, display name) so the messaging queries can resolve
//! counterpart names without leaving the database.

use std::str::FromStr;

use carelink_core::{CarelinkError, Facility, Identity, Role};
use rusqlite::params;

use crate::database::Database;

/// Parse the `role` column of a row, mapping strum errors into rusqlite's
/// conversion failure so query closures stay uniform.
pub(crate) fn role_from_row(idx: usize, raw: String) -> Result<Role, rusqlite::Error> {
    Role::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Insert an identity projection.
pub async fn create_identity(db: &Database, identity: &Identity) -> Result<(), CarelinkError> {
    let identity = identity.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO identities (id, role, display_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    identity.id,
                    identity.role.to_string(),
                    identity.display_name,
                    identity.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an identity by ID.
pub async fn get_identity(db: &Database, id: &str) -> Result<Option<Identity>, CarelinkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, role, display_name, created_at FROM identities WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(Identity {
                    id: row.get(0)?,
                    role: role_from_row(1, row.get(1)?)?,
                    display_name: row.get(2)?,
                    created_at: row.get(3)?,
                })
            });
            match result {
                Ok(identity) => Ok(Some(identity)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert a facility profile.
pub async fn create_facility(db: &Database, facility: &Facility) -> Result<(), CarelinkError> {
    let facility = facility.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO facilities (id, operator_id, name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    facility.id,
                    facility.operator_id,
                    facility.name,
                    facility.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a facility by ID.
pub async fn get_facility(db: &Database, id: &str) -> Result<Option<Facility>, CarelinkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, operator_id, name, created_at FROM facilities WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(Facility {
                    id: row.get(0)?,
                    operator_id: row.get(1)?,
                    name: row.get(2)?,
                    created_at: row.get(3)?,
                })
            });
            match result {
                Ok(facility) => Ok(Some(facility)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_identity(id: &str, role: Role, name: &str) -> Identity {
        Identity {
            id: id.to_string(),
            role,
            display_name: name.to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_get_identity_roundtrips() {
        let (db, _dir) = setup_db().await;
        let identity = make_identity("user-1", Role::Consumer, "佐藤花子");

        create_identity(&db, &identity).await.unwrap();
        let retrieved = get_identity(&db, "user-1").await.unwrap().unwrap();
        assert_eq!(retrieved.id, "user-1");
        assert_eq!(retrieved.role, Role::Consumer);
        assert_eq!(retrieved.display_name, "佐藤花子");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn operator_role_round_trips_through_check_constraint() {
        let (db, _dir) = setup_db().await;
        let operator = make_identity("op-1", Role::FacilityOperator, "田中太郎");

        create_identity(&db, &operator).await.unwrap();
        let retrieved = get_identity(&db, "op-1").await.unwrap().unwrap();
        assert_eq!(retrieved.role, Role::FacilityOperator);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_identity_returns_none() {
        let (db, _dir) = setup_db().await;
        let result = get_identity(&db, "no-such-identity").await.unwrap();
        assert!(result.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn create_and_get_facility_roundtrips() {
        let (db, _dir) = setup_db().await;
        let operator = make_identity("op-1", Role::FacilityOperator, "田中太郎");
        create_identity(&db, &operator).await.unwrap();

        let facility = Facility {
            id: "fac-1".to_string(),
            operator_id: "op-1".to_string(),
            name: "さくら福祉センター".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        create_facility(&db, &facility).await.unwrap();

        let retrieved = get_facility(&db, "fac-1").await.unwrap().unwrap();
        assert_eq!(retrieved.operator_id, "op-1");
        assert_eq!(retrieved.name, "さくら福祉センター");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn facility_requires_existing_operator() {
        let (db, _dir) = setup_db().await;
        let facility = Facility {
            id: "fac-orphan".to_string(),
            operator_id: "ghost".to_string(),
            name: "nowhere".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let result = create_facility(&db, &facility).await;
        assert!(result.is_err(), "foreign key should reject missing operator");
        db.close().await.unwrap();
    }
}
