use session_core::AuthError;
use session_core::error::{ConfigError, StoreError};

use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the command-line client.
///
/// Printed as text by default and serialized with `--json`, so each variant keeps a
/// plain message plus the location it was raised at.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PosSessionError {
    /// Error from this app (logger, terminal I/O)
    #[error("Pos Session Error: {message} {location}")]
    Session {
        message: String,
        location: ErrorLocation,
    },

    /// Config file or environment could not be used
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// A storage scope could not be opened
    #[error("Storage Error: {message} {location}")]
    Storage {
        message: String,
        location: ErrorLocation,
    },

    /// Session check or login failed. `message` is the text shown to the cashier.
    #[error("Auth Error ({category}): {message} {location}")]
    Auth {
        message: String,
        category: String,
        location: ErrorLocation,
    },
}

impl PosSessionError {
    #[track_caller]
    pub fn session(message: impl Into<String>) -> Self {
        PosSessionError::Session {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PosSessionError::Session { .. } => 1,
            PosSessionError::Config { .. } => 2,
            PosSessionError::Storage { .. } => 3,
            PosSessionError::Auth { category, .. } if category == "circuit_broken" => 5,
            PosSessionError::Auth { .. } => 4,
        }
    }

    /// Message without the location suffix.
    pub fn message(&self) -> &str {
        match self {
            PosSessionError::Session { message, .. }
            | PosSessionError::Config { message, .. }
            | PosSessionError::Storage { message, .. }
            | PosSessionError::Auth { message, .. } => message,
        }
    }
}

impl From<AuthError> for PosSessionError {
    #[track_caller]
    fn from(error: AuthError) -> Self {
        PosSessionError::Auth {
            message: error.user_message(),
            category: error.error_category().to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<ConfigError> for PosSessionError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        PosSessionError::Config {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<StoreError> for PosSessionError {
    #[track_caller]
    fn from(error: StoreError) -> Self {
        PosSessionError::Storage {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
