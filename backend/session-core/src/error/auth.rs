//! Error types for session checks and login.
//!
//! Key design decisions:
//! - HTTP status codes stored directly (not parsed from strings)
//! - The server's `{message}` is kept separately from the formatted error so it can
//!   be shown to the cashier verbatim
//! - All errors include ErrorLocation for debugging
//! - `#[track_caller]` for automatic location capture

use common::{ErrorLocation, HttpStatusCode};
use models::ModelError;

use thiserror::Error as ThisError;

/// Shown when a login fails without a server-provided message.
pub const LOGIN_FAILED_FALLBACK_MESSAGE: &str =
    "Login failed. Please check your credentials and try again.";

/// Shown when a session check fails without a server-provided message.
pub const AUTH_FAILED_FALLBACK_MESSAGE: &str = "Authentication failed";

/// Shown when a login is refused because the breaker is tripped.
pub const CIRCUIT_BROKEN_MESSAGE: &str = "Too many failed attempts. Please try again later.";

/// Errors that can occur while checking a session or logging in.
#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error(
        "Auth rejected: HTTP {status_code} - {text} {location}",
        text = .message.as_deref().unwrap_or("<no message>")
    )]
    Rejected {
        status_code: HttpStatusCode,
        message: Option<String>,
        location: ErrorLocation,
    },

    #[error("Network error: {message} {location}")]
    Network {
        message: String,
        is_timeout: bool,
        is_connection: bool,
        location: ErrorLocation,
    },

    #[error("Response decode error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },

    #[error("No token received from server {location}")]
    MissingToken { location: ErrorLocation },

    #[error("Session check timed out after {timeout_ms}ms {location}")]
    Timeout {
        timeout_ms: u64,
        location: ErrorLocation,
    },

    #[error("Circuit breaker active - auth attempts suspended {location}")]
    CircuitBroken { location: ErrorLocation },

    #[error("Superseded by a newer auth action {location}")]
    Superseded { location: ErrorLocation },

    #[error("Invalid credentials: {message} {location}")]
    InvalidCredentials {
        message: String,
        location: ErrorLocation,
    },

    #[error("URL Parse Error: {message} {location}")]
    UrlParse {
        message: String,
        location: ErrorLocation,
    },
}

impl AuthError {
    #[track_caller]
    pub fn rejected(status_code: impl Into<HttpStatusCode>, message: Option<String>) -> Self {
        AuthError::Rejected {
            status_code: status_code.into(),
            message,
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn decode(message: impl Into<String>) -> Self {
        AuthError::Decode {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn missing_token() -> Self {
        AuthError::MissingToken {
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn timeout(timeout_ms: u64) -> Self {
        AuthError::Timeout {
            timeout_ms,
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn superseded() -> Self {
        AuthError::Superseded {
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn circuit_broken() -> Self {
        AuthError::CircuitBroken {
            location: ErrorLocation::caller(),
        }
    }

    /// Create from reqwest error with proper categorization.
    #[track_caller]
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        // Check for specific error types BEFORE converting to string
        let is_timeout = error.is_timeout();
        let is_connection = error.is_connect();

        if !is_timeout && !is_connection {
            if let Some(status) = error.status() {
                return AuthError::Rejected {
                    status_code: HttpStatusCode(status.as_u16()),
                    message: None,
                    location: ErrorLocation::caller(),
                };
            }
            if error.is_decode() {
                return AuthError::decode(error.to_string());
            }
        }

        AuthError::Network {
            message: error.to_string(),
            is_timeout,
            is_connection,
            location: ErrorLocation::caller(),
        }
    }

    /// The message a cashier sees on the login page.
    ///
    /// Server-provided text wins; otherwise a fixed fallback so a failure is never
    /// silent.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            AuthError::InvalidCredentials { message, .. } => message.clone(),
            AuthError::CircuitBroken { .. } => CIRCUIT_BROKEN_MESSAGE.to_string(),
            AuthError::MissingToken { .. } => "No token received from server".to_string(),
            _ => LOGIN_FAILED_FALLBACK_MESSAGE.to_string(),
        }
    }

    /// Same as [`user_message`](Self::user_message), but with the session-check fallback.
    pub fn session_message(&self) -> String {
        match self {
            AuthError::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            AuthError::Timeout { .. } => "Session check timed out".to_string(),
            _ => AUTH_FAILED_FALLBACK_MESSAGE.to_string(),
        }
    }

    /// Did the server look at the token/credentials and refuse them?
    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthError::Rejected { status_code, .. } if status_code.is_auth_rejection())
    }

    /// Get error category for logs.
    pub fn error_category(&self) -> &'static str {
        match self {
            AuthError::Rejected { status_code, .. } if status_code.is_header_too_large() => {
                "header_too_large"
            }
            AuthError::Rejected { status_code, .. } if status_code.is_client_error() => {
                "client_error"
            }
            AuthError::Rejected { status_code, .. } if status_code.is_server_error() => {
                "server_error"
            }
            AuthError::Rejected { .. } => "rejected",
            AuthError::Network {
                is_timeout: true, ..
            } => "transport_timeout",
            AuthError::Network {
                is_connection: true,
                ..
            } => "connection",
            AuthError::Network { .. } => "network",
            AuthError::Decode { .. } => "decode",
            AuthError::MissingToken { .. } => "missing_token",
            AuthError::Timeout { .. } => "timeout",
            AuthError::CircuitBroken { .. } => "circuit_broken",
            AuthError::Superseded { .. } => "superseded",
            AuthError::InvalidCredentials { .. } => "validation",
            AuthError::UrlParse { .. } => "url_parse",
        }
    }

    /// Get HTTP status code if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AuthError::Rejected { status_code, .. } => Some(status_code.0),
            _ => None,
        }
    }

    /// Whether this failure counts toward the circuit breaker.
    ///
    /// Local refusals (bad form input, breaker already open) never reached the server.
    pub fn counts_toward_breaker(&self) -> bool {
        !matches!(
            self,
            AuthError::InvalidCredentials { .. }
                | AuthError::CircuitBroken { .. }
                | AuthError::Superseded { .. }
        )
    }
}

impl From<ModelError> for AuthError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        AuthError::InvalidCredentials {
            message: error.message().to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<url::ParseError> for AuthError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        AuthError::UrlParse {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        AuthError::from_reqwest(&error)
    }
}
