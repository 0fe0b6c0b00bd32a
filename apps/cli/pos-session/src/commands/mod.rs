//! Subcommand handlers.
//!
//! Each handler drives the session controller and returns a report; printing is left
//! to the caller so handlers can be tested without a terminal.

pub mod auth;
pub mod config;
pub mod report;
pub mod reset;

use crate::cli::{Cli, Command};
use crate::error::PosSessionError;
use crate::session::{SessionContext, SessionOptions, load_config, resolve_paths};

use std::io::{BufRead, stdin};

use report::{ConfigReport, StatusReport};

use log::debug;
use serde::Serialize;

/// Run `command` and return the text to print.
///
/// # Errors
///
/// Returns [`PosSessionError`] for failures the caller should report and exit on.
pub async fn run(cli: &Cli) -> Result<String, PosSessionError> {
    run_command(&cli.command, &cli.options(), cli.json).await
}

pub async fn run_command(
    command: &Command,
    options: &SessionOptions,
    json: bool,
) -> Result<String, PosSessionError> {
    debug!("Running {command:?}");

    let report = match command {
        Command::Status => {
            let context = SessionContext::open(options)?;
            Report::Status(auth::status(&context).await)
        }
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password.clone(),
                None => read_password()?,
            };
            let context = SessionContext::open(options)?;
            Report::Status(auth::login(&context, email.clone(), password).await?)
        }
        Command::Logout => {
            let context = SessionContext::open(options)?;
            Report::Status(auth::logout(&context).await)
        }
        Command::Reset { clear_all } => {
            let context = SessionContext::open(options)?;
            Report::Status(reset::reset(&context, *clear_all).await)
        }
        Command::Config { init } => {
            let paths = resolve_paths(options)?;
            let config = load_config(&paths, options)?;
            Report::Config(config::show(&paths, &config, *init)?)
        }
    };

    report.render(json)
}

/// Output of any subcommand.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Status(StatusReport),
    Config(ConfigReport),
}

impl Report {
    /// Pretty JSON with `json`, otherwise terminal text.
    ///
    /// # Errors
    ///
    /// Returns [`PosSessionError::Session`] if the report cannot be serialized.
    pub fn render(&self, json: bool) -> Result<String, PosSessionError> {
        if json {
            return serde_json::to_string_pretty(self)
                .map_err(|e| PosSessionError::session(format!("Failed to serialize report: {e}")));
        }

        Ok(match self {
            Report::Status(report) => report.render_text(),
            Report::Config(report) => report.render_text(),
        })
    }
}

fn read_password() -> Result<String, PosSessionError> {
    eprint!("Password: ");
    let mut line = String::new();
    stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| PosSessionError::session(format!("Failed to read password: {e}")))?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
