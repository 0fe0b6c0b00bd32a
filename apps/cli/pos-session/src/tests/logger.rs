// Unit tests for logger module initialization logic
// Tests focus on thread-safety and error handling

use crate::logger::{DEFAULT_LOG_LEVEL, LOG_FILE_NAME, build_dispatch, initialize, level_for_verbosity};

use std::path::PathBuf;

use log::LevelFilter;
use tempfile::TempDir;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: Logger initialization might be reached from more than one code
/// path (startup, tests). If it panics or errors on the second call, the client would
/// crash before running a command.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed,
/// causing fern to panic when trying to set a global logger twice.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = TempDir::new().unwrap();

    // WHEN: Calling initialize twice
    let result1 = initialize(temp_dir.path(), LevelFilter::Info);
    let result2 = initialize(temp_dir.path(), LevelFilter::Debug);

    // THEN: Both should return Ok (second one logs warning but doesn't error)
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(
        result2.is_ok(),
        "Second initialization should succeed (idempotent)"
    );
    assert!(temp_dir.path().join(LOG_FILE_NAME).exists());
}

/// **VALUE**: Verifies that the dispatch handles unusable directories gracefully.
///
/// **WHY THIS MATTERS**: If the data directory can't be written (permissions, disk full),
/// the client should return a clear error instead of panicking.
///
/// **BUG THIS CATCHES**: Would catch if `fern::log_file()` unwraps instead of returning
/// a Result.
#[test]
fn given_invalid_log_dir_when_dispatch_built_then_returns_error() {
    // GIVEN: A path that is guaranteed to be unwritable on Unix-like systems
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    // WHEN: Building the dispatch
    let result = build_dispatch(&invalid_dir, LevelFilter::Info);

    // THEN: Should return error (not panic)
    let err = result.err().expect("Should return error for invalid log directory");
    let err_string = format!("{:?}", err);
    assert!(
        err_string.contains("Session"),
        "Error should be PosSessionError::Session variant"
    );
}

#[test]
fn given_verbosity_flags_when_mapped_then_levels_increase() {
    assert_eq!(level_for_verbosity(0), DEFAULT_LOG_LEVEL);
    assert_eq!(level_for_verbosity(1), LevelFilter::Debug);
    assert_eq!(level_for_verbosity(5), LevelFilter::Trace);
}
