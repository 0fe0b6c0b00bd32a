//! Wiring: storage paths, config, storage scopes, transport and controller.

use crate::error::PosSessionError;

use session_core::config::{PathSource, SessionConfig, StoragePaths};
use session_core::store::FileStore;
use session_core::transport::HttpSessionTransport;
use session_core::{SessionController, SessionSettings};

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};

/// Overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub data_dir: Option<PathBuf>,
    pub api_url: Option<String>,
}

/// Everything a command needs to drive the session.
pub struct SessionContext {
    pub paths: StoragePaths,
    pub config: SessionConfig,
    pub controller: SessionController,
}

/// Resolve the data directory: `--data-dir`, then `POS_DATA_DIR`, then the platform
/// default.
///
/// # Errors
///
/// Returns [`PosSessionError::Config`] if no directory can be determined.
pub fn resolve_paths(options: &SessionOptions) -> Result<StoragePaths, PosSessionError> {
    match &options.data_dir {
        Some(dir) => Ok(StoragePaths::in_dir(dir.clone(), PathSource::Explicit)),
        None => Ok(StoragePaths::detect()?),
    }
}

/// Load the config file, then layer `.env`/`POS_API_URL`, then `--api-url`.
///
/// # Errors
///
/// Returns [`PosSessionError::Config`] if the file is corrupt or a value is invalid.
pub fn load_config(
    paths: &StoragePaths,
    options: &SessionOptions,
) -> Result<SessionConfig, PosSessionError> {
    let mut config = SessionConfig::load(&paths.data_dir)?;
    config.apply_env_overrides()?;

    if let Some(url) = &options.api_url {
        debug!("Using --api-url override: {url}");
        config.api_base_url = url.clone();
        config.validate()?;
    }

    Ok(config)
}

impl SessionContext {
    /// Open both storage scopes and build the controller.
    ///
    /// # Errors
    ///
    /// Returns an error if config cannot be loaded, a storage scope cannot be opened,
    /// or the API URL cannot be used.
    pub fn open(options: &SessionOptions) -> Result<Self, PosSessionError> {
        let paths = resolve_paths(options)?;
        let config = load_config(&paths, options)?;
        Self::with_config(paths, config)
    }

    pub fn with_config(paths: StoragePaths, config: SessionConfig) -> Result<Self, PosSessionError> {
        info!(
            "Session data in {} (from {})",
            paths.data_dir.display(),
            paths.source
        );

        let persistent = Arc::new(FileStore::open(&paths.persistent_file)?);
        let ephemeral = Arc::new(FileStore::open(&paths.ephemeral_file)?);
        let transport = Arc::new(HttpSessionTransport::with_request_timeout(
            &config.api_base_url,
            config.request_timeout(),
        )?);

        let controller = SessionController::new(
            SessionSettings::from(&config),
            transport,
            persistent,
            ephemeral,
        );

        Ok(Self {
            paths,
            config,
            controller,
        })
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.controller.shutdown();
    }
}
