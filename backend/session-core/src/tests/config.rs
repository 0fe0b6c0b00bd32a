use crate::config::paths::DATA_DIR_ENV;
use crate::config::{API_URL_ENV, PathSource, SessionConfig, StoragePaths};
use crate::controller::SessionSettings;
use crate::error::ConfigError;

use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

#[test]
fn given_no_config_file_when_loaded_then_defaults_returned() {
    // GIVEN: Empty config directory
    let dir = TempDir::new().unwrap();

    // WHEN: Loading
    let config = SessionConfig::load(dir.path()).unwrap();

    // THEN: Five-second check, threshold five
    assert_eq!(config, SessionConfig::default());
    assert_eq!(config.check_timeout(), Duration::from_secs(5));
    assert_eq!(config.trip_threshold, 5);
    assert_eq!(config.api_base_url, crate::POS_API_DEFAULT_BASE_URL);
}

#[test]
fn given_saved_config_when_loaded_then_values_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = SessionConfig {
        api_base_url: "https://pos.example.com".to_string(),
        trip_threshold: 3,
        ..SessionConfig::default()
    };

    config.save(dir.path()).unwrap();
    let loaded = SessionConfig::load(dir.path()).unwrap();

    assert_eq!(loaded, config);
    assert!(!dir.path().join("session.json.tmp").exists());
}

#[test]
fn given_partial_json_when_loaded_then_missing_fields_defaulted() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("session.json"),
        r#"{"api_base_url": "http://10.0.0.5:3000"}"#,
    )
    .unwrap();

    let config = SessionConfig::load(dir.path()).unwrap();

    assert_eq!(config.api_base_url, "http://10.0.0.5:3000");
    assert_eq!(config.check_timeout_ms, 5_000);
}

#[test]
fn given_corrupt_json_when_loaded_then_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("session.json"), "not json").unwrap();

    let result = SessionConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn given_non_http_url_when_validated_then_validation_error() {
    let config = SessionConfig {
        api_base_url: "ftp://pos.example.com".to_string(),
        ..SessionConfig::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError { .. })
    ));
}

/// **VALUE**: The transport timeout must not cut the session check short.
///
/// **BUG THIS CATCHES**: A request timeout shorter than the race window would turn
/// every slow `/me` into a network error that clears the token, instead of a timeout
/// that keeps it.
#[test]
fn given_request_timeout_shorter_than_check_timeout_when_validated_then_rejected() {
    let config = SessionConfig {
        check_timeout_ms: 5_000,
        request_timeout_ms: 1_000,
        ..SessionConfig::default()
    };

    let result = config.validate();

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
fn given_zero_threshold_or_timeout_when_validated_then_rejected() {
    let zero_threshold = SessionConfig {
        trip_threshold: 0,
        ..SessionConfig::default()
    };
    let zero_timeout = SessionConfig {
        check_timeout_ms: 0,
        ..SessionConfig::default()
    };

    assert!(zero_threshold.validate().is_err());
    assert!(zero_timeout.validate().is_err());
}

#[test]
fn given_config_when_converted_to_settings_then_values_carried_over() {
    let config = SessionConfig {
        check_timeout_ms: 250,
        request_timeout_ms: 1_000,
        trip_threshold: 2,
        ..SessionConfig::default()
    };

    let settings = SessionSettings::from(&config);

    assert_eq!(settings.check_timeout, Duration::from_millis(250));
    assert_eq!(settings.trip_threshold, 2);
}

#[test]
#[serial]
fn given_api_url_env_when_overrides_applied_then_url_replaced() {
    // GIVEN: POS_API_URL set
    // SAFETY: serialized with every other test touching the environment.
    unsafe { std::env::set_var(API_URL_ENV, "https://override.example.com") };
    let mut config = SessionConfig::default();

    // WHEN: Applying overrides
    let result = config.apply_env_overrides();
    unsafe { std::env::remove_var(API_URL_ENV) };

    // THEN: Override wins
    assert!(result.is_ok());
    assert_eq!(config.api_base_url, "https://override.example.com");
}

#[test]
#[serial]
fn given_invalid_api_url_env_when_overrides_applied_then_validation_error() {
    // SAFETY: serialized with every other test touching the environment.
    unsafe { std::env::set_var(API_URL_ENV, "not a url") };
    let mut config = SessionConfig::default();

    let result = config.apply_env_overrides();
    unsafe { std::env::remove_var(API_URL_ENV) };

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
#[serial]
fn given_data_dir_env_when_paths_detected_then_env_dir_used() {
    let dir = TempDir::new().unwrap();
    // SAFETY: serialized with every other test touching the environment.
    unsafe { std::env::set_var(DATA_DIR_ENV, dir.path()) };

    let paths = StoragePaths::detect();
    unsafe { std::env::remove_var(DATA_DIR_ENV) };

    let paths = paths.unwrap();
    assert_eq!(paths.source, PathSource::EnvVar);
    assert_eq!(paths.data_dir, dir.path());
    assert_eq!(paths.persistent_file, dir.path().join("local-storage.json"));
}

#[test]
fn given_two_data_dirs_when_laid_out_then_ephemeral_files_differ() {
    let a = StoragePaths::in_dir("/tmp/a/register-1".into(), PathSource::EnvVar);
    let b = StoragePaths::in_dir("/tmp/b/register-2".into(), PathSource::EnvVar);

    assert_ne!(a.ephemeral_file, b.ephemeral_file);
    assert!(a.ephemeral_file.starts_with(std::env::temp_dir()));
}

/// **VALUE**: Breaker records stay per data directory even when the directories share
/// a final path component.
///
/// **BUG THIS CATCHES**: `/srv/store1/data` and `/srv/store2/data` counting failures
/// into one breaker file, so one register's lockout trips the other.
#[test]
fn given_data_dirs_with_same_name_when_laid_out_then_ephemeral_files_differ() {
    // GIVEN: Two profiles whose directories are both called `data`
    let first = StoragePaths::in_dir("/srv/store1/data".into(), PathSource::Explicit);
    let second = StoragePaths::in_dir("/srv/store2/data".into(), PathSource::Explicit);

    // THEN: Separate breaker files
    assert_ne!(first.ephemeral_file, second.ephemeral_file);
}

#[test]
fn given_same_data_dir_when_laid_out_twice_then_ephemeral_file_stable() {
    let first = StoragePaths::in_dir("/srv/store1/data".into(), PathSource::Explicit);
    let again = StoragePaths::in_dir("/srv/store1/data/".into(), PathSource::EnvVar);

    assert_eq!(first.ephemeral_file, again.ephemeral_file);
    assert!(first.ephemeral_file.ends_with("session-storage.json"));
}

#[test]
fn given_separator_in_dir_name_when_laid_out_then_not_confused_with_nested_dir() {
    let flat = StoragePaths::in_dir("/srv/a_b".into(), PathSource::Explicit);
    let nested = StoragePaths::in_dir("/srv/a/b".into(), PathSource::Explicit);

    assert_ne!(flat.ephemeral_file, nested.ephemeral_file);
}
