//! Subcommands end to end: file-backed storage under a temp directory, mock POS API.

use pos_session::cli::Command;
use pos_session::commands::run_command;
use pos_session::session::{SessionOptions, resolve_paths};

use session_core::config::StoragePaths;

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Register {
    _dir: TempDir,
    options: SessionOptions,
    paths: StoragePaths,
}

impl Register {
    fn new(server: &MockServer) -> Self {
        let dir = TempDir::new().unwrap();
        let options = SessionOptions {
            data_dir: Some(dir.path().to_path_buf()),
            api_url: Some(server.uri()),
        };
        let paths = resolve_paths(&options).unwrap();
        Self {
            _dir: dir,
            options,
            paths,
        }
    }

    async fn run(&self, command: Command) -> Result<Value, pos_session::error::PosSessionError> {
        let output = run_command(&command, &self.options, true).await?;
        Ok(serde_json::from_str(&output).unwrap())
    }

    fn stored(&self, file: &std::path::Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(file).unwrap_or_else(|_| "{}".into()))
            .unwrap()
    }
}

impl Drop for Register {
    fn drop(&mut self) {
        if let Some(parent) = self.paths.ephemeral_file.parent() {
            std::fs::remove_dir_all(parent).ok();
        }
    }
}

fn login(email: &str, password: &str) -> Command {
    Command::Login {
        email: email.to_string(),
        password: Some(password.to_string()),
    }
}

async fn mount_login_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "fresh-token",
            "user": { "id": "7", "name": "Sam", "role": "cashier" }
        })))
        .mount(server)
        .await;
}

/// **VALUE**: A login in one run is honoured by the next run's startup check.
///
/// **WHY THIS MATTERS**: Each command is a separate process; the token only survives
/// through the persistent scope on disk.
///
/// **BUG THIS CATCHES**: Writing the token somewhere the next run does not read, or
/// sending it in the wrong header.
#[tokio::test]
async fn given_successful_login_when_status_run_later_then_session_restored() {
    // GIVEN: API accepting the login and the issued token
    let server = MockServer::start().await;
    mount_login_success(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("x-auth-token", "fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "7", "name": "Sam", "role": "cashier"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let register = Register::new(&server);

    // WHEN: Logging in, then checking status in a fresh context
    let after_login = register.run(login("sam@shop.com", "secret")).await.unwrap();
    let status = register.run(Command::Status).await.unwrap();

    // THEN: Both runs report the signed-in user
    assert_eq!(after_login["phase"], "Authenticated");
    assert_eq!(status["phase"], "Authenticated");
    assert_eq!(status["user"]["name"], "Sam");
    assert_eq!(status["dashboard"], "Render");
    assert_eq!(
        register.stored(&register.paths.persistent_file)["token"],
        "fresh-token"
    );
}

/// **VALUE**: Failures are counted across runs and the sixth login never leaves the
/// machine.
///
/// **BUG THIS CATCHES**: A breaker record that resets with every process, which would
/// make the breaker useless for a command-line client.
#[tokio::test]
async fn given_five_failed_logins_across_runs_when_sixth_attempted_then_blocked_locally() {
    // GIVEN: API refusing every login
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .expect(5)
        .mount(&server)
        .await;
    let register = Register::new(&server);

    // WHEN: Five refused logins
    for _ in 0..5 {
        let err = register.run(login("a@b.com", "bad")).await.unwrap_err();
        assert_eq!(err.message(), "Invalid credentials");
        assert_eq!(err.exit_code(), 4);
    }

    // THEN: Status shows the broken circuit, and a sixth login is refused locally
    let status = register.run(Command::Status).await.unwrap();
    assert_eq!(status["breaker_tripped"], true);
    assert_eq!(status["failed_attempts"], 5);

    let sixth = register.run(login("a@b.com", "bad")).await.unwrap_err();
    assert_eq!(sixth.exit_code(), 5);
}

#[tokio::test]
async fn given_tripped_breaker_when_reset_run_then_login_allowed_again() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(5)
        .mount(&server)
        .await;
    mount_login_success(&server).await;
    let register = Register::new(&server);
    for _ in 0..5 {
        let _ = register.run(login("a@b.com", "bad")).await;
    }

    let reset = register.run(Command::Reset { clear_all: false }).await.unwrap();
    let login_again = register.run(login("sam@shop.com", "secret")).await.unwrap();

    assert_eq!(reset["phase"], "Unauthenticated");
    assert_eq!(reset["failed_attempts"], 0);
    assert_eq!(login_again["phase"], "Authenticated");
}

#[tokio::test]
async fn given_signed_in_when_logout_run_then_token_removed() {
    let server = MockServer::start().await;
    mount_login_success(&server).await;
    let register = Register::new(&server);
    register.run(login("sam@shop.com", "secret")).await.unwrap();

    let report = register.run(Command::Logout).await.unwrap();

    assert_eq!(report["phase"], "Unauthenticated");
    assert_eq!(report["has_token"], false);
    assert_eq!(register.stored(&register.paths.persistent_file), json!({}));
}

#[tokio::test]
async fn given_stored_data_when_reset_clear_all_run_then_both_scopes_wiped() {
    let server = MockServer::start().await;
    mount_login_success(&server).await;
    let register = Register::new(&server);
    register.run(login("sam@shop.com", "secret")).await.unwrap();

    let report = register.run(Command::Reset { clear_all: true }).await.unwrap();

    assert_eq!(report["phase"], "Unauthenticated");
    assert_eq!(register.stored(&register.paths.persistent_file), json!({}));
    assert_eq!(register.stored(&register.paths.ephemeral_file), json!({}));
}

#[tokio::test]
async fn given_incomplete_form_when_login_run_then_refused_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let register = Register::new(&server);

    let err = register.run(login("a@b.com", "")).await.unwrap_err();

    assert_eq!(err.message(), "Please enter all fields");
}

#[tokio::test]
async fn given_config_init_when_run_then_config_file_written() {
    let server = MockServer::start().await;
    let register = Register::new(&server);

    let report = register.run(Command::Config { init: true }).await.unwrap();

    assert_eq!(report["written"], true);
    assert_eq!(report["config"]["api_base_url"], server.uri());
    assert!(register.paths.data_dir.join("session.json").exists());
}
