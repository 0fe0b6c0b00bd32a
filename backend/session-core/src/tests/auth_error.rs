use crate::error::AuthError;
use crate::error::auth::{
    AUTH_FAILED_FALLBACK_MESSAGE, CIRCUIT_BROKEN_MESSAGE, LOGIN_FAILED_FALLBACK_MESSAGE,
};

use models::ModelError;

/// **VALUE**: The server's `{message}` is what the cashier sees.
///
/// **BUG THIS CATCHES**: Showing the formatted Rust error (with file/line) on the
/// login page instead of "Invalid credentials".
#[test]
fn given_rejection_with_server_message_when_user_message_then_server_text_returned() {
    // GIVEN: 400 with a message
    let error = AuthError::rejected(400u16, Some("Invalid credentials".to_string()));

    // WHEN/THEN: Message passes through verbatim
    assert_eq!(error.user_message(), "Invalid credentials");
    assert_eq!(error.session_message(), "Invalid credentials");
    assert_eq!(error.status_code(), Some(400));
}

#[test]
fn given_rejection_without_message_when_user_message_then_fallback_used() {
    let error = AuthError::rejected(500u16, None);

    assert_eq!(error.user_message(), LOGIN_FAILED_FALLBACK_MESSAGE);
    assert_eq!(error.session_message(), AUTH_FAILED_FALLBACK_MESSAGE);
}

#[test]
fn given_blank_server_message_when_user_message_then_fallback_used() {
    let error = AuthError::rejected(401u16, Some("   ".to_string()));

    assert_eq!(error.user_message(), LOGIN_FAILED_FALLBACK_MESSAGE);
}

#[test]
fn given_timeout_when_session_message_then_timeout_text() {
    let error = AuthError::timeout(5_000);

    assert_eq!(error.session_message(), "Session check timed out");
    assert_eq!(error.error_category(), "timeout");
    assert!(error.to_string().contains("5000ms"));
}

#[test]
fn given_auth_statuses_when_is_rejection_then_true_only_for_auth_refusals() {
    assert!(AuthError::rejected(401u16, None).is_rejection());
    assert!(AuthError::rejected(400u16, None).is_rejection());
    assert!(!AuthError::rejected(503u16, None).is_rejection());
    assert!(!AuthError::timeout(1).is_rejection());
}

#[test]
fn given_local_refusals_when_counts_toward_breaker_then_false() {
    let invalid = AuthError::from(ModelError::validation("Please enter all fields"));

    assert!(!invalid.counts_toward_breaker());
    assert!(!AuthError::circuit_broken().counts_toward_breaker());
    assert!(!AuthError::superseded().counts_toward_breaker());
    assert!(AuthError::rejected(401u16, None).counts_toward_breaker());
    assert!(AuthError::timeout(5_000).counts_toward_breaker());
    assert!(AuthError::missing_token().counts_toward_breaker());
}

#[test]
fn given_validation_error_when_converted_then_message_kept() {
    let error = AuthError::from(ModelError::validation("Please enter all fields"));

    assert_eq!(error.user_message(), "Please enter all fields");
    assert_eq!(error.error_category(), "validation");
}

#[test]
fn given_circuit_broken_when_user_message_then_try_later_text() {
    assert_eq!(
        AuthError::circuit_broken().user_message(),
        CIRCUIT_BROKEN_MESSAGE
    );
}

#[test]
fn given_error_when_displayed_then_includes_location() {
    let error = AuthError::missing_token();

    let text = error.to_string();

    assert!(text.contains("No token received from server"));
    assert!(text.contains("auth_error.rs"), "location missing: {text}");
}
