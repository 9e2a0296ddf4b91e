//! Integration tests for config resolution and atomic TOML writes

use serial_test::serial;
use std::path::PathBuf;
use stylo_common::config::{
    load_config, load_toml_config, resolve_config_path, write_toml_config, LoggingConfig,
    OpenAiSection, TomlConfig, CONFIG_ENV_VAR,
};
use tempfile::TempDir;

fn sample_config() -> TomlConfig {
    let mut config = TomlConfig {
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        ..Default::default()
    };
    config.paths.input_dir = Some(PathBuf::from("/books"));
    config.checkpoint.interval = Some(5);
    config.openai = Some(OpenAiSection {
        endpoint: Some("https://example.openai.azure.com".to_string()),
        deployment: Some("gpt-4o".to_string()),
        api_version: None,
        api_key: Some("secret-key".to_string()),
    });
    config
}

#[test]
fn test_write_then_load_preserves_fields() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("stylo.toml");

    let config = sample_config();
    write_toml_config(&config, &target).unwrap();

    let loaded = load_toml_config(&target).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_write_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("stylo.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    assert!(target.exists());
    assert!(!temp_dir.path().join("stylo.toml.tmp").exists());
}

#[test]
fn test_write_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("nested").join("dir").join("stylo.toml");

    write_toml_config(&TomlConfig::default(), &target).unwrap();
    assert!(target.exists());
}

#[cfg(unix)]
#[test]
fn test_written_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("stylo.toml");
    write_toml_config(&sample_config(), &target).unwrap();

    let mode = std::fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[cfg(unix)]
#[test]
fn test_stale_world_readable_temp_is_replaced() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("stylo.toml");
    let stale = target.with_extension("toml.tmp");
    std::fs::write(&stale, "leftover").unwrap();
    std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o644)).unwrap();

    write_toml_config(&sample_config(), &target).unwrap();

    let mode = std::fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert!(!stale.exists());
    assert_eq!(load_toml_config(&target).unwrap(), sample_config());
}

#[test]
fn test_load_missing_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_toml_config(&temp_dir.path().join("absent.toml"));
    assert!(matches!(result, Err(stylo_common::Error::Config(_))));
}

#[test]
fn test_load_malformed_toml_fails() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("bad.toml");
    std::fs::write(&target, "[logging\nlevel = ").unwrap();

    assert!(load_toml_config(&target).is_err());
}

#[test]
#[serial]
fn test_cli_path_beats_env() {
    std::env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = resolve_config_path(Some(PathBuf::from("/from/cli.toml").as_path()));
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/from/cli.toml")));
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    std::env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = resolve_config_path(None);
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/from/env.toml")));
}

#[test]
#[serial]
fn test_load_config_reads_env_file() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("stylo.toml");
    write_toml_config(&sample_config(), &target).unwrap();

    std::env::set_var(CONFIG_ENV_VAR, &target);
    let loaded = load_config(None);
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(loaded.unwrap().checkpoint.interval, Some(5));
}
