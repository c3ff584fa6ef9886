// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use carelink_core::CarelinkError;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Handle to the single SQLite connection.
///
/// Query modules accept `&Database` and run their closures through
/// [`Database::connection`]; tokio-rusqlite serializes all of them on one
/// background thread, which eliminates SQLITE_BUSY under concurrent access.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode enabled and run
    /// all pending migrations.
    pub async fn open(path: &str) -> Result<Self, CarelinkError> {
        Self::open_with(path, true).await
    }

    /// Open with explicit control over WAL mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, CarelinkError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CarelinkError::Storage { source: Box::new(e) })?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        let journal_mode = if wal_mode { "WAL" } else { "DELETE" };
        let pragmas = format!(
            "PRAGMA journal_mode = {journal_mode};
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;"
        );
        // The closure can only carry rusqlite errors, so migration failures
        // ride in the Ok value and are unwrapped after the call.
        let migrated: Result<(), CarelinkError> = conn
            .call(move |conn| {
                conn.execute_batch(&pragmas)?;
                Ok(crate::migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?;
        migrated?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), CarelinkError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the crate-wide storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> CarelinkError {
    CarelinkError::Storage {
        source: Box::new(e),
    }
}
