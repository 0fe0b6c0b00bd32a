use super::report::ConfigReport;
use crate::error::PosSessionError;

use session_core::config::{SessionConfig, StoragePaths};

use log::info;

/// Describe the effective settings, writing them to the config file with `init`.
///
/// # Errors
///
/// Returns [`PosSessionError::Config`] if the config file cannot be written.
pub fn show(
    paths: &StoragePaths,
    config: &SessionConfig,
    init: bool,
) -> Result<ConfigReport, PosSessionError> {
    if init {
        config.save(&paths.data_dir)?;
        info!("Wrote session config to {}", paths.data_dir.display());
    }

    Ok(ConfigReport::new(paths, config, init))
}
