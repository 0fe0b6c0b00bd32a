use crate::session::SessionOptions;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Sign in to the POS API and manage the stored session.
#[derive(Debug, Parser)]
#[command(name = "pos-session", version, about)]
pub struct Cli {
    /// Directory holding the session config and the stored token
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// POS API base URL (wins over the config file and POS_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check the stored session against the API
    Status,

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored token
    Logout,

    /// Reset the circuit breaker after too many failed attempts
    Reset {
        /// Also wipe every stored value, token included
        #[arg(long)]
        clear_all: bool,
    },

    /// Show where the session lives and which settings are in effect
    Config {
        /// Write the effective settings to the config file
        #[arg(long)]
        init: bool,
    },
}

impl Cli {
    pub fn options(&self) -> SessionOptions {
        SessionOptions {
            data_dir: self.data_dir.clone(),
            api_url: self.api_url.clone(),
        }
    }
}
