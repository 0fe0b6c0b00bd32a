use std::path::PathBuf;

use common::ErrorLocation;
use thiserror::Error as ThisError;

/// Failures opening or persisting a file-backed store.
///
/// Only surfaced when a store is opened; once running, write failures are logged
/// and the in-memory value still applies.
#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("Store Directory Error: {path}: {source} {location}")]
    Directory {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store Write Error: {path}: {source} {location}")]
    Write {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store Serialization Error: {reason} {location}")]
    Serialize {
        location: ErrorLocation,
        reason: String,
    },
}
