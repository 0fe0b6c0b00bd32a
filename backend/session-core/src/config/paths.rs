//! Where the two storage scopes and the config file live.
//!
//! Lookup order for the persistent data directory:
//! 1. `POS_DATA_DIR` environment variable (explicit override)
//! 2. Platform-specific data directory via `dirs`
//!
//! The ephemeral scope lives under the OS temp directory so it is gone after a reboot,
//! the closest a command-line client gets to a browser tab's session storage.

use crate::error::config::ConfigError;

use std::env;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "POS_DATA_DIR";

const APP_DIR_NAME: &str = "pos-session";
const PERSISTENT_FILE_NAME: &str = "local-storage.json";
const EPHEMERAL_FILE_NAME: &str = "session-storage.json";

/// Resolved storage locations.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    /// Directory holding the config file and the persistent scope.
    pub data_dir: PathBuf,
    /// File backing the persistent scope (bearer token).
    pub persistent_file: PathBuf,
    /// File backing the ephemeral scope (breaker record).
    pub ephemeral_file: PathBuf,
    /// How `data_dir` was determined.
    pub source: PathSource,
}

/// How the data directory was determined (for logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    /// Passed in by the caller.
    Explicit,
    EnvVar,
    PlatformDefault,
}

impl std::fmt::Display for PathSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSource::Explicit => write!(f, "explicit path"),
            PathSource::EnvVar => write!(f, "{DATA_DIR_ENV}"),
            PathSource::PlatformDefault => write!(f, "platform default"),
        }
    }
}

impl StoragePaths {
    /// Detect storage paths for this user.
    ///
    /// # Errors
    /// Returns [`ConfigError::ValidationError`] if no data directory can be determined.
    pub fn detect() -> Result<Self, ConfigError> {
        if let Ok(custom_dir) = env::var(DATA_DIR_ENV) {
            info!("Using {DATA_DIR_ENV} override: {custom_dir}");
            return Ok(Self::in_dir(PathBuf::from(custom_dir), PathSource::EnvVar));
        }

        let Some(base) = dirs::data_local_dir() else {
            return Err(ConfigError::validation(format!(
                "Cannot determine data directory; set {DATA_DIR_ENV}"
            )));
        };

        let paths = Self::in_dir(base.join(APP_DIR_NAME), PathSource::PlatformDefault);
        debug!("Detected data directory: {}", paths.data_dir.display());
        Ok(paths)
    }

    /// Lay out both scopes for an explicit data directory.
    ///
    /// The ephemeral file is keyed by the escaped absolute path of the data directory,
    /// so directories that only share a final component get separate breaker records.
    pub fn in_dir(data_dir: PathBuf, source: PathSource) -> Self {
        let scope = scope_key(&data_dir);

        let persistent_file = data_dir.join(PERSISTENT_FILE_NAME);
        let ephemeral_file = env::temp_dir()
            .join(APP_DIR_NAME)
            .join(scope)
            .join(EPHEMERAL_FILE_NAME);

        Self {
            data_dir,
            persistent_file,
            ephemeral_file,
            source,
        }
    }
}

/// Escape `data_dir` into a single file name component.
///
/// ASCII alphanumerics, `-` and `.` pass through; every other byte becomes `_XX`.
fn scope_key(data_dir: &Path) -> String {
    let absolute = std::path::absolute(data_dir).unwrap_or_else(|_| data_dir.to_path_buf());
    let raw = absolute.to_string_lossy();

    let mut key = String::with_capacity(raw.len());
    for byte in raw.trim_end_matches(['/', '\\']).bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            key.push(char::from(byte));
        } else {
            let _ = write!(key, "_{byte:02x}");
        }
    }

    if key.is_empty() {
        APP_DIR_NAME.to_string()
    } else {
        key
    }
}
