//! Configuration resolution tests
//!
//! Tests that manipulate MIGRATION_LOGS_DIR are marked with #[serial]
//! so they never race each other on the process environment.

use migration_common::config::{
    default_logs_dir, resolve_logs_dir, FailurePolicy, ReportConfig, TomlConfig, LOGS_DIR_ENV,
};
use migration_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_env_var_overrides_toml() {
    env::set_var(LOGS_DIR_ENV, "/tmp/migration-env-logs");

    let resolved = resolve_logs_dir(None, LOGS_DIR_ENV, Some(Path::new("/from/toml")));
    assert_eq!(resolved, PathBuf::from("/tmp/migration-env-logs"));

    env::remove_var(LOGS_DIR_ENV);
}

#[test]
#[serial]
fn test_cli_overrides_env_var() {
    env::set_var(LOGS_DIR_ENV, "/tmp/migration-env-logs");

    let resolved = resolve_logs_dir(Some(Path::new("/from/cli")), LOGS_DIR_ENV, None);
    assert_eq!(resolved, PathBuf::from("/from/cli"));

    env::remove_var(LOGS_DIR_ENV);
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var(LOGS_DIR_ENV, "   ");

    let resolved = resolve_logs_dir(None, LOGS_DIR_ENV, None);
    assert_eq!(resolved, default_logs_dir());

    env::remove_var(LOGS_DIR_ENV);
}

#[test]
#[serial]
fn test_report_config_resolve_carries_toml_settings() {
    env::remove_var(LOGS_DIR_ENV);

    let toml_config = TomlConfig::parse(
        r#"
        logs_dir = "/var/migration"
        failure_policy = "skip"
        write_previews = true
        "#,
    )
    .unwrap();

    let config = ReportConfig::resolve(None, toml_config);
    assert_eq!(config.logs_dir, PathBuf::from("/var/migration"));
    assert_eq!(config.failure_policy, FailurePolicy::Skip);
    assert!(config.write_previews);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_load_explicit_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("report.toml");
    std::fs::write(
        &config_path,
        "logs_dir = \"/data/logs\"\n[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();

    let config = TomlConfig::load(Some(&config_path)).unwrap();
    assert_eq!(config.logs_dir, Some(PathBuf::from("/data/logs")));
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.failure_policy, FailurePolicy::Abort);
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    let result = TomlConfig::load(Some(&missing));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.toml");
    std::fs::write(&config_path, "logs_dir = [unterminated").unwrap();

    let result = TomlConfig::load(Some(&config_path));
    assert!(matches!(result, Err(Error::Toml(_))));
}
