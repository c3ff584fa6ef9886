// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `carelink doctor` command implementation.
//!
//! Runs diagnostic checks against the configured environment to identify
//! configuration and storage problems before they surface as user-facing
//! failures.

use std::time::{Duration, Instant};

use carelink_bus::EventBus;
use carelink_config::model::CarelinkConfig;
use carelink_core::{CarelinkError, ConversationStore, HealthStatus};
use carelink_storage::SqliteStore;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

impl CheckStatus {
    fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "FAIL",
        }
    }
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Check status.
    pub status: CheckStatus,
    /// Human-readable message.
    pub message: String,
    /// Duration the check took.
    pub duration: Duration,
}

/// Run the `carelink doctor` command.
pub async fn run_doctor(config: &CarelinkConfig) -> Result<(), CarelinkError> {
    let results = vec![
        check_config(config),
        check_database(config).await,
    ];

    let mut failed = false;
    for result in &results {
        println!(
            "[{:>4}] {} -- {} ({:?})",
            result.status.symbol(),
            result.name,
            result.message,
            result.duration
        );
        if result.status == CheckStatus::Fail {
            failed = true;
        }
    }

    if failed {
        return Err(CarelinkError::Internal(
            "one or more doctor checks failed".to_string(),
        ));
    }
    Ok(())
}

fn check_config(config: &CarelinkConfig) -> CheckResult {
    let start = Instant::now();
    // Loading already validated; report what the effective values are.
    CheckResult {
        name: "config".to_string(),
        status: CheckStatus::Pass,
        message: format!(
            "app.name={}, storage.database_path={}",
            config.app.name, config.storage.database_path
        ),
        duration: start.elapsed(),
    }
}

async fn check_database(config: &CarelinkConfig) -> CheckResult {
    let start = Instant::now();
    let store = SqliteStore::new(config.storage.clone(), EventBus::default());

    let outcome = async {
        store.initialize().await?;
        let status = store.health_check().await?;
        store.close().await?;
        Ok::<HealthStatus, CarelinkError>(status)
    }
    .await;

    match outcome {
        Ok(HealthStatus::Healthy) => CheckResult {
            name: "database".to_string(),
            status: CheckStatus::Pass,
            message: "open, migrated, responsive".to_string(),
            duration: start.elapsed(),
        },
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => CheckResult {
            name: "database".to_string(),
            status: CheckStatus::Warn,
            message: reason,
            duration: start.elapsed(),
        },
        Err(e) => CheckResult {
            name: "database".to_string(),
            status: CheckStatus::Fail,
            message: format!("{e}"),
            duration: start.elapsed(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_config::model::StorageConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn doctor_passes_against_a_writable_path() {
        let dir = tempdir().unwrap();
        let config = CarelinkConfig {
            storage: StorageConfig {
                database_path: dir
                    .path()
                    .join("doctor.db")
                    .to_string_lossy()
                    .into_owned(),
                wal_mode: true,
            },
            ..CarelinkConfig::default()
        };
        run_doctor(&config).await.unwrap();
    }

    #[tokio::test]
    async fn doctor_fails_against_an_unwritable_path() {
        let config = CarelinkConfig {
            storage: StorageConfig {
                database_path: "/proc/carelink/doctor.db".to_string(),
                wal_mode: true,
            },
            ..CarelinkConfig::default()
        };
        assert!(run_doctor(&config).await.is_err());
    }
}
