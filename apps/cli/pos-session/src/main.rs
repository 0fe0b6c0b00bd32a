use pos_session::cli::Cli;
use pos_session::commands;
use pos_session::error::PosSessionError;
use pos_session::logger::{initialize as LoggerInitialize, level_for_verbosity};
use pos_session::session::resolve_paths;

use std::fs::create_dir_all;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

const LOG_DIR_NAME: &str = "logs";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match start_logging(&cli) {
        Ok(()) => commands::run(&cli).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            if cli.json {
                match serde_json::to_string_pretty(&e) {
                    Ok(json) => println!("{json}"),
                    Err(_) => eprintln!("{}", e.message()),
                }
            } else {
                eprintln!("{}", e.message());
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn start_logging(cli: &Cli) -> Result<(), PosSessionError> {
    let paths = resolve_paths(&cli.options())?;
    let log_dir = paths.data_dir.join(LOG_DIR_NAME);

    create_dir_all(&log_dir).map_err(|e| {
        PosSessionError::session(format!("Failed to create log directory: {e}"))
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir, level_for_verbosity(cli.verbose))?;

    info!("pos-session {} starting", env!("CARGO_PKG_VERSION"));
    info!("Log directory: {}", log_dir.display());
    Ok(())
}
