pub mod paths;

pub use paths::{PathSource, StoragePaths};

use crate::POS_API_DEFAULT_BASE_URL;
use crate::controller::DEFAULT_CHECK_TIMEOUT;
use crate::error::config::ConfigError;
use crate::store::DEFAULT_TRIP_THRESHOLD;

use common::ErrorLocation;

use std::env;
use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "session.json";
const CONFIG_VERSION: u32 = 1;

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "POS_API_URL";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

// ============================================
// CONFIG STRUCT
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Race window for the session check, in milliseconds.
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,

    /// Consecutive failures before the circuit breaker trips.
    #[serde(default = "default_trip_threshold")]
    pub trip_threshold: u32,

    /// Per-request HTTP timeout, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api_base_url: default_api_base_url(),
            check_timeout_ms: default_check_timeout_ms(),
            trip_threshold: default_trip_threshold(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_api_base_url() -> String {
    POS_API_DEFAULT_BASE_URL.to_string()
}
fn default_check_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_CHECK_TIMEOUT.as_millis()).unwrap_or(5_000)
}
fn default_trip_threshold() -> u32 {
    DEFAULT_TRIP_THRESHOLD
}
fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

// ============================================
// IMPLEMENTATION
// ============================================

impl SessionConfig {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Load config from {config_dir}/session.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(SessionConfig)` if loaded successfully or defaults if file missing.
    /// Returns `Err(ConfigError)` if file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Session config not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read session config: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: SessionConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse session config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Session config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/session.json using atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation, serialization, write
    /// or rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Session config saved to {}", config_path.display());
        Ok(())
    }

    /// Apply `POS_API_URL` (from the process environment or a `.env` file).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the override is not a valid URL.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded .env from: {}", path.display()),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => warn!("Failed to parse .env: {}", e),
        }

        match env::var(API_URL_ENV) {
            Ok(url) => {
                info!("Using {API_URL_ENV} override: {url}");
                self.api_base_url = url;
            }
            Err(env::VarError::NotPresent) => {}
            Err(env::VarError::NotUnicode(_)) => {
                warn!("{API_URL_ENV} contains invalid unicode, ignoring");
            }
        }

        self.validate()
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        if self.api_base_url.is_empty() {
            return Err(ConfigError::validation("api_base_url cannot be empty string"));
        }

        if url::Url::parse(&self.api_base_url).is_err()
            || (!self.api_base_url.starts_with("http://")
                && !self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::validation(format!(
                "Invalid URL format: {}",
                self.api_base_url
            )));
        }

        if self.check_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "check_timeout_ms must be greater than 0",
            ));
        }

        if self.trip_threshold == 0 {
            return Err(ConfigError::validation("trip_threshold must be at least 1"));
        }

        if self.request_timeout_ms < self.check_timeout_ms {
            return Err(ConfigError::validation(format!(
                "request_timeout_ms ({}) must not be shorter than check_timeout_ms ({})",
                self.request_timeout_ms, self.check_timeout_ms
            )));
        }

        Ok(())
    }
}
