//! What a command prints: a snapshot of the session plus what each page would show.

use crate::session::SessionContext;

use session_core::AuthState;
use session_core::config::{SessionConfig, StoragePaths};
use session_core::error::auth::CIRCUIT_BROKEN_MESSAGE;
use session_core::guard::{LoginRouteDecision, RouteDecision, login_route, protected_route};
use session_core::machine::AuthPhase;

use models::Identity;

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub phase: AuthPhase,
    pub user: Option<Identity>,
    pub last_error: Option<String>,
    pub has_token: bool,
    pub failed_attempts: u32,
    pub breaker_tripped: bool,
    pub dashboard: RouteDecision,
    pub login_page: LoginRouteDecision,
    pub api_base_url: String,
}

impl StatusReport {
    pub fn capture(context: &SessionContext, state: &AuthState) -> Self {
        let controller = &context.controller;

        Self {
            phase: state.phase(),
            user: state.user().cloned(),
            last_error: state.last_error().map(str::to_string),
            has_token: controller.has_token(),
            failed_attempts: controller.breaker_attempts(),
            breaker_tripped: controller.is_breaker_tripped(),
            dashboard: protected_route(state),
            login_page: login_route(state),
            api_base_url: context.config.api_base_url.clone(),
        }
    }

    /// Text for the terminal, following what the dashboard route would show.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        match self.dashboard {
            RouteDecision::CircuitBrokenPage => {
                let _ = writeln!(out, "{CIRCUIT_BROKEN_MESSAGE}");
                let _ = writeln!(
                    out,
                    "Run `pos-session reset` to try again, or `pos-session reset --clear-all` to wipe stored data."
                );
            }
            RouteDecision::Spinner => {
                let _ = writeln!(out, "Still checking the session...");
            }
            RouteDecision::Render => {
                if let Some(user) = &self.user {
                    let _ = write!(out, "Signed in as {}", user.name);
                    if let Some(role) = &user.role {
                        let _ = write!(out, " ({role})");
                    }
                    let _ = writeln!(out);
                }
            }
            RouteDecision::RedirectToLogin => {
                let _ = writeln!(out, "Not signed in.");
                if let Some(error) = &self.last_error {
                    let _ = writeln!(out, "{error}");
                }
            }
        }

        if self.failed_attempts > 0 && !self.breaker_tripped {
            let _ = writeln!(out, "Failed attempts: {}", self.failed_attempts);
        }

        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    pub data_dir: PathBuf,
    pub source: String,
    pub persistent_file: PathBuf,
    pub ephemeral_file: PathBuf,
    pub config: SessionConfig,
    pub written: bool,
}

impl ConfigReport {
    pub fn new(paths: &StoragePaths, config: &SessionConfig, written: bool) -> Self {
        Self {
            data_dir: paths.data_dir.clone(),
            source: paths.source.to_string(),
            persistent_file: paths.persistent_file.clone(),
            ephemeral_file: paths.ephemeral_file.clone(),
            config: config.clone(),
            written,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Data directory:  {} ({})", self.data_dir.display(), self.source);
        let _ = writeln!(out, "Token store:     {}", self.persistent_file.display());
        let _ = writeln!(out, "Breaker store:   {}", self.ephemeral_file.display());
        let _ = writeln!(out, "API base URL:    {}", self.config.api_base_url);
        let _ = writeln!(out, "Check timeout:   {}ms", self.config.check_timeout_ms);
        let _ = writeln!(out, "Trip threshold:  {}", self.config.trip_threshold);
        let _ = writeln!(out, "Request timeout: {}ms", self.config.request_timeout_ms);
        if self.written {
            let _ = writeln!(out, "Config written.");
        }
        out
    }
}
