// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Carelink configuration system.

use carelink_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_carelink_config() {
    let toml = r#"
[app]
name = "carelink-test"
log_level = "debug"

[storage]
database_path = "/tmp/carelink-test.db"
wal_mode = false

[bus]
capacity = 64
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.app.name, "carelink-test");
    assert_eq!(config.app.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/carelink-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.bus.capacity, 64);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty config should use defaults");
    assert_eq!(config.app.name, "carelink");
    assert_eq!(config.app.log_level, "info");
    assert!(config.storage.wal_mode);
    assert_eq!(config.bus.capacity, 256);
    assert!(!config.storage.database_path.is_empty());
}

/// Unknown field in a section is rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_storage_produces_error() {
    let toml = r#"
[storage]
databse_path = "/tmp/typo.db"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("databse_path"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// An unrecognized log level fails semantic validation.
#[test]
fn bogus_log_level_fails_validation() {
    let toml = r#"
[app]
log_level = "loud"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 1);
    assert!(format!("{}", errors[0]).contains("app.log_level"));
}

/// A zero-capacity bus and an empty database path are both reported.
#[test]
fn validation_collects_all_errors() {
    let toml = r#"
[storage]
database_path = ""

[bus]
capacity = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2);
    let rendered: Vec<String> = errors.iter().map(|e| format!("{e}")).collect();
    assert!(rendered.iter().any(|e| e.contains("storage.database_path")));
    assert!(rendered.iter().any(|e| e.contains("bus.capacity")));
}
