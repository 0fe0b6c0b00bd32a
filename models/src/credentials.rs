//! Login credentials with client-side shape validation.
//!
//! Validation runs before the request goes out so that an empty form or a typo'd
//! address fails fast and never reaches the server (or the failure counter).

use crate::ModelError;

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

/// Email + password pair sent as the `POST /api/auth/login` body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Check the fields the server would reject before it even looks up the user.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ModelError::validation("Please enter all fields"));
        }

        if !EMAIL_PATTERN.is_match(self.email.trim()) {
            return Err(ModelError::validation(format!(
                "Invalid email address: {}",
                self.email.trim()
            )));
        }

        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
