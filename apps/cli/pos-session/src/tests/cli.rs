use crate::cli::{Cli, Command};

use std::path::PathBuf;

use clap::{CommandFactory, Parser};

#[test]
fn given_cli_definition_when_debug_asserted_then_valid() {
    Cli::command().debug_assert();
}

#[test]
fn given_global_flags_after_subcommand_when_parsed_then_applied() {
    // GIVEN/WHEN: Flags placed after the subcommand
    let cli = Cli::parse_from([
        "pos-session",
        "status",
        "--data-dir",
        "/tmp/register-1",
        "--json",
        "-vv",
    ]);

    // THEN: Picked up as globals
    assert!(matches!(cli.command, Command::Status));
    assert!(cli.json);
    assert_eq!(cli.verbose, 2);
    assert_eq!(
        cli.options().data_dir,
        Some(PathBuf::from("/tmp/register-1"))
    );
}

#[test]
fn given_login_without_password_when_parsed_then_password_left_empty() {
    let cli = Cli::parse_from(["pos-session", "login", "--email", "a@b.com"]);

    match cli.command {
        Command::Login { email, password } => {
            assert_eq!(email, "a@b.com");
            assert_eq!(password, None);
        }
        other => panic!("Expected login, got {other:?}"),
    }
}

#[test]
fn given_reset_clear_all_when_parsed_then_flag_set() {
    let cli = Cli::parse_from(["pos-session", "reset", "--clear-all"]);

    assert!(matches!(cli.command, Command::Reset { clear_all: true }));
}
