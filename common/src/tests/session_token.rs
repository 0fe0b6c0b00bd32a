use crate::SessionToken;

/// **VALUE**: Verifies tokens never leak through Debug or Display.
///
/// **WHY THIS MATTERS**: The controller logs state transitions and errors freely. If a
/// `SessionToken` ends up in a log line, the bearer credential lands in the log file.
///
/// **BUG THIS CATCHES**: Would catch a derived Debug sneaking back in.
#[test]
fn given_session_token_when_formatted_then_value_is_redacted() {
    // GIVEN: A token with a recognizable value
    let token = SessionToken::new("eyJhbGciOiJIUzI1NiJ9.secret");

    // WHEN: Formatting with Debug and Display
    let debug = format!("{:?}", token);
    let display = format!("{}", token);

    // THEN: Neither contains the value
    assert!(!debug.contains("secret"));
    assert!(!display.contains("secret"));
    assert_eq!(token.expose(), "eyJhbGciOiJIUzI1NiJ9.secret");
    assert_eq!(token.len(), 27);
}

/// **VALUE**: Tokens refuse accidental serialization.
#[test]
fn given_session_token_when_serialized_then_returns_error() {
    // GIVEN: A token
    let token = SessionToken::new("abc");

    // WHEN: Serializing via serde_json
    let result = serde_json::to_string(&token);

    // THEN: Serialization fails
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("cannot be serialized"));
}

#[test]
fn given_json_string_when_deserialized_then_token_wraps_value() {
    let token: SessionToken = serde_json::from_str("\"tok-123\"").unwrap();

    assert_eq!(token.expose(), "tok-123");
    assert!(!token.is_empty());
}
