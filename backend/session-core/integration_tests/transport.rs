//! HTTP transport against a mock POS API.

use session_core::AuthError;
use session_core::transport::{AUTH_TOKEN_HEADER, HttpSessionTransport, SessionTransport};

use common::SessionToken;
use models::Credentials;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn transport_for(server: &MockServer) -> HttpSessionTransport {
    HttpSessionTransport::new(&server.uri()).expect("valid mock server URL")
}

/// **VALUE**: The token goes out in `x-auth-token`, and `/me` returns the raw user
/// document.
///
/// **BUG THIS CATCHES**: Sending the token as `Authorization: Bearer`, which the POS
/// API ignores, or failing to decode `_id`.
#[tokio::test]
async fn given_valid_token_when_check_session_then_identity_returned() {
    // GIVEN: /me accepts our token
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header(AUTH_TOKEN_HEADER, "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "1",
            "name": "A",
            "email": "a@b.com",
            "role": "admin"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let transport = transport_for(&server).await;

    // WHEN: Checking the session
    let identity = transport
        .check_session(&SessionToken::new("abc"))
        .await
        .unwrap();

    // THEN: Identity decoded
    assert_eq!(identity.id, "1");
    assert_eq!(identity.name, "A");
    assert!(identity.is_admin());
}

#[tokio::test]
async fn given_rejected_token_when_check_session_then_rejection_with_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Token is not valid" })),
        )
        .mount(&server)
        .await;
    let transport = transport_for(&server).await;

    let error = transport
        .check_session(&SessionToken::new("expired"))
        .await
        .unwrap_err();

    assert!(error.is_rejection());
    assert_eq!(error.status_code(), Some(401));
    assert_eq!(error.session_message(), "Token is not valid");
}

#[tokio::test]
async fn given_server_error_without_json_when_check_session_then_fallback_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server Error"))
        .mount(&server)
        .await;
    let transport = transport_for(&server).await;

    let error = transport
        .check_session(&SessionToken::new("abc"))
        .await
        .unwrap_err();

    assert!(!error.is_rejection());
    assert_eq!(error.error_category(), "server_error");
    assert_eq!(error.session_message(), "Authentication failed");
}

#[tokio::test]
async fn given_valid_credentials_when_login_then_token_and_user_returned() {
    // GIVEN: Login endpoint expecting the JSON body
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "a@b.com", "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "fresh-token",
            "user": { "id": "1", "name": "A", "email": "a@b.com", "role": "cashier" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let transport = transport_for(&server).await;

    // WHEN: Logging in
    let success = transport
        .login(&Credentials::new("a@b.com", "secret"))
        .await
        .unwrap();

    // THEN: Token and user surfaced
    assert_eq!(success.token.expose(), "fresh-token");
    assert_eq!(success.user.name, "A");
    assert_eq!(success.user.role.as_deref(), Some("cashier"));
}

#[tokio::test]
async fn given_bad_password_when_login_then_invalid_credentials_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;
    let transport = transport_for(&server).await;

    let error = transport
        .login(&Credentials::new("a@b.com", "bad"))
        .await
        .unwrap_err();

    assert_eq!(error.user_message(), "Invalid credentials");
    assert_eq!(error.status_code(), Some(400));
}

/// **VALUE**: A 200 without a token is a failed login, not a silent success.
///
/// **BUG THIS CATCHES**: Storing an empty token and entering `Authenticated` with no
/// way to make authenticated calls.
#[tokio::test]
async fn given_response_without_token_when_login_then_missing_token_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "id": "1", "name": "A" }
        })))
        .mount(&server)
        .await;
    let transport = transport_for(&server).await;

    let error = transport
        .login(&Credentials::new("a@b.com", "secret"))
        .await
        .unwrap_err();

    assert!(matches!(error, AuthError::MissingToken { .. }));
    assert!(error.counts_toward_breaker());
}

#[tokio::test]
async fn given_login_request_when_sent_then_no_token_header_attached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(header_exists(AUTH_TOKEN_HEADER))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "t",
            "user": { "id": "1", "name": "A" }
        })))
        .mount(&server)
        .await;
    let transport = transport_for(&server).await;

    let result = transport.login(&Credentials::new("a@b.com", "secret")).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn given_base_url_with_path_when_requests_built_then_path_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pos/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1", "name": "A" })))
        .expect(1)
        .mount(&server)
        .await;
    let transport = HttpSessionTransport::new(&format!("{}/pos", server.uri())).unwrap();

    let identity = transport.check_session(&SessionToken::new("abc")).await;

    assert!(identity.is_ok());
    assert!(transport.base_url().as_str().ends_with("/pos/"));
}

#[tokio::test]
async fn given_unreachable_server_when_check_session_then_network_error() {
    // GIVEN: Nothing listening
    let transport =
        HttpSessionTransport::with_request_timeout("http://127.0.0.1:1", Duration::from_secs(2))
            .unwrap();

    // WHEN: Checking the session
    let error = transport
        .check_session(&SessionToken::new("abc"))
        .await
        .unwrap_err();

    // THEN: Network failure, not a rejection
    assert!(matches!(error, AuthError::Network { .. }));
    assert!(!error.is_rejection());
}

#[test]
fn given_invalid_base_url_when_transport_built_then_url_parse_error() {
    let result = HttpSessionTransport::new("not a url");

    assert!(matches!(result, Err(AuthError::UrlParse { .. })));
}
