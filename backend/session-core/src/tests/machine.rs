// Unit tests for the pure transition function.
// Controller-level sequencing is covered in integration_tests/controller.rs

use crate::machine::{AuthEvent, AuthPhase, AuthState, transition};

use models::Identity;

fn cashier() -> Identity {
    Identity::new("u-1", "Dana").with_role("cashier")
}

fn rejected(message: &str, breaker_tripped: bool) -> AuthEvent {
    AuthEvent::IdentityRejected {
        message: message.to_string(),
        breaker_tripped,
    }
}

fn timed_out(breaker_tripped: bool) -> AuthEvent {
    AuthEvent::TimedOut {
        message: "Session check timed out".to_string(),
        breaker_tripped,
    }
}

#[test]
fn given_idle_and_no_token_when_bootstrap_then_unauthenticated_without_error() {
    // GIVEN: Fresh start, no stored token
    let state = AuthState::Idle;

    // WHEN: Bootstrapping
    let next = transition(
        &state,
        AuthEvent::Bootstrap {
            has_token: false,
            breaker_tripped: false,
        },
    );

    // THEN: Straight to the login page, nothing to report
    assert_eq!(next, AuthState::unauthenticated());
    assert_eq!(next.last_error(), None);
}

/// **VALUE**: The breaker flag must win over a stored token at startup.
///
/// **BUG THIS CATCHES**: Issuing `/me` while tripped would keep hammering an API that
/// already refused this client five times.
#[test]
fn given_idle_with_token_and_tripped_breaker_when_bootstrap_then_circuit_broken() {
    // GIVEN: Token present, breaker tripped by an earlier run
    let state = AuthState::Idle;

    // WHEN: Bootstrapping
    let next = transition(
        &state,
        AuthEvent::Bootstrap {
            has_token: true,
            breaker_tripped: true,
        },
    );

    // THEN: Circuit broken, no check
    assert_eq!(next, AuthState::CircuitBroken);
}

#[test]
fn given_idle_with_token_when_bootstrap_then_checking_session() {
    let next = transition(
        &AuthState::Idle,
        AuthEvent::Bootstrap {
            has_token: true,
            breaker_tripped: false,
        },
    );

    assert_eq!(next, AuthState::CheckingSession);
    assert!(next.is_busy());
}

#[test]
fn given_authenticated_when_bootstrap_again_then_state_unchanged() {
    // GIVEN: Already authenticated
    let state = AuthState::Authenticated { user: cashier() };

    // WHEN: A second bootstrap event arrives
    let next = transition(
        &state,
        AuthEvent::Bootstrap {
            has_token: false,
            breaker_tripped: false,
        },
    );

    // THEN: Ignored
    assert_eq!(next, state);
}

#[test]
fn given_checking_session_when_identity_resolved_then_authenticated_with_user() {
    let next = transition(
        &AuthState::CheckingSession,
        AuthEvent::IdentityResolved(cashier()),
    );

    assert!(next.is_authenticated());
    assert_eq!(next.user(), Some(&cashier()));
    assert_eq!(next.last_error(), None);
}

#[test]
fn given_checking_session_when_identity_rejected_below_threshold_then_unauthenticated_with_message()
 {
    // GIVEN: Check in flight
    let state = AuthState::CheckingSession;

    // WHEN: Server says the token is bad, breaker still clear
    let next = transition(&state, rejected("Token is not valid", false));

    // THEN: Login page with the server's message
    assert_eq!(next.phase(), AuthPhase::Unauthenticated);
    assert_eq!(next.last_error(), Some("Token is not valid"));
    assert_eq!(next.user(), None);
}

#[test]
fn given_checking_session_when_identity_rejected_and_tripped_then_circuit_broken() {
    let next = transition(&AuthState::CheckingSession, rejected("Token is not valid", true));

    assert_eq!(next, AuthState::CircuitBroken);
}

#[test]
fn given_checking_session_when_timed_out_then_timed_out_with_message() {
    let next = transition(&AuthState::CheckingSession, timed_out(false));

    assert_eq!(next.phase(), AuthPhase::TimedOut);
    assert_eq!(next.last_error(), Some("Session check timed out"));
    assert!(!next.is_busy());
}

#[test]
fn given_checking_session_when_timed_out_and_tripped_then_circuit_broken() {
    let next = transition(&AuthState::CheckingSession, timed_out(true));

    assert_eq!(next, AuthState::CircuitBroken);
}

/// **VALUE**: A result that arrives after the timeout already fired is dropped.
///
/// **WHY THIS MATTERS**: The timeout and the late identity race each other; only the
/// first outcome may be observed.
///
/// **BUG THIS CATCHES**: Flipping from `TimedOut` to `Authenticated` when a slow `/me`
/// finally answers.
#[test]
fn given_timed_out_when_late_identity_resolved_then_stays_timed_out() {
    // GIVEN: The check already timed out
    let state = transition(&AuthState::CheckingSession, timed_out(false));

    // WHEN: The identity shows up late
    let next = transition(&state, AuthEvent::IdentityResolved(cashier()));

    // THEN: Still timed out
    assert_eq!(next, state);
}

#[test]
fn given_authenticated_when_late_rejection_arrives_then_stays_authenticated() {
    let state = AuthState::Authenticated { user: cashier() };

    let next = transition(&state, rejected("Token is not valid", true));

    assert_eq!(next, state);
}

#[test]
fn given_unauthenticated_or_timed_out_when_check_started_then_checking_session() {
    let from_unauth = transition(&AuthState::unauthenticated(), AuthEvent::CheckStarted);
    let from_timeout = transition(
        &AuthState::TimedOut {
            last_error: "Session check timed out".to_string(),
        },
        AuthEvent::CheckStarted,
    );

    assert_eq!(from_unauth, AuthState::CheckingSession);
    assert_eq!(from_timeout, AuthState::CheckingSession);
}

#[test]
fn given_circuit_broken_when_check_started_then_stays_circuit_broken() {
    let next = transition(&AuthState::CircuitBroken, AuthEvent::CheckStarted);

    assert_eq!(next, AuthState::CircuitBroken);
}

#[test]
fn given_timed_out_when_breaker_tripped_event_then_circuit_broken() {
    let state = AuthState::TimedOut {
        last_error: "Session check timed out".to_string(),
    };

    let next = transition(&state, AuthEvent::BreakerTripped);

    assert_eq!(next, AuthState::CircuitBroken);
}

#[test]
fn given_unauthenticated_when_login_attempted_then_checking_session() {
    let next = transition(
        &AuthState::unauthenticated(),
        AuthEvent::LoginAttempted {
            breaker_tripped: false,
        },
    );

    assert_eq!(next, AuthState::CheckingSession);
}

/// **VALUE**: Login is refused locally while the breaker is tripped.
///
/// **BUG THIS CATCHES**: Letting a cashier brute-force the login form after the
/// breaker opened.
#[test]
fn given_any_state_when_login_attempted_with_tripped_breaker_then_circuit_broken() {
    // GIVEN: Several starting states
    let states = [
        AuthState::Idle,
        AuthState::unauthenticated(),
        AuthState::TimedOut {
            last_error: "Session check timed out".to_string(),
        },
        AuthState::CircuitBroken,
    ];

    for state in states {
        // WHEN: Login attempted with the breaker tripped
        let next = transition(
            &state,
            AuthEvent::LoginAttempted {
                breaker_tripped: true,
            },
        );

        // THEN: Circuit broken, no request phase
        assert_eq!(next, AuthState::CircuitBroken, "from {:?}", state.phase());
    }
}

#[test]
fn given_circuit_broken_when_login_attempted_without_flag_then_stays_circuit_broken() {
    let next = transition(
        &AuthState::CircuitBroken,
        AuthEvent::LoginAttempted {
            breaker_tripped: false,
        },
    );

    assert_eq!(next, AuthState::CircuitBroken);
}

#[test]
fn given_checking_session_when_login_succeeded_then_authenticated() {
    let next = transition(
        &AuthState::CheckingSession,
        AuthEvent::LoginSucceeded(cashier()),
    );

    assert_eq!(next.user().map(|u| u.name.as_str()), Some("Dana"));
}

#[test]
fn given_checking_session_when_login_failed_then_unauthenticated_or_broken() {
    let below = transition(
        &AuthState::CheckingSession,
        AuthEvent::LoginFailed {
            message: "Invalid credentials".to_string(),
            breaker_tripped: false,
        },
    );
    let tripped = transition(
        &AuthState::CheckingSession,
        AuthEvent::LoginFailed {
            message: "Invalid credentials".to_string(),
            breaker_tripped: true,
        },
    );

    assert_eq!(below.last_error(), Some("Invalid credentials"));
    assert_eq!(tripped, AuthState::CircuitBroken);
}

#[test]
fn given_circuit_broken_when_breaker_reset_then_unauthenticated_without_error() {
    let next = transition(&AuthState::CircuitBroken, AuthEvent::BreakerReset);

    assert_eq!(next, AuthState::unauthenticated());
}

#[test]
fn given_unauthenticated_when_breaker_reset_then_unchanged() {
    let state = AuthState::Unauthenticated {
        last_error: Some("Invalid credentials".to_string()),
    };

    let next = transition(&state, AuthEvent::BreakerReset);

    assert_eq!(next, state);
}

#[test]
fn given_any_state_when_logout_then_unauthenticated_without_error() {
    let states = [
        AuthState::Idle,
        AuthState::CheckingSession,
        AuthState::Authenticated { user: cashier() },
        AuthState::TimedOut {
            last_error: "Session check timed out".to_string(),
        },
        AuthState::CircuitBroken,
    ];

    for state in states {
        assert_eq!(
            transition(&state, AuthEvent::Logout),
            AuthState::unauthenticated(),
            "from {:?}",
            state.phase()
        );
    }
}

#[test]
fn given_unauthenticated_with_error_when_clear_error_then_error_removed() {
    let state = AuthState::Unauthenticated {
        last_error: Some("Invalid credentials".to_string()),
    };

    let next = transition(&state, AuthEvent::ClearError);

    assert_eq!(next.last_error(), None);
}

#[test]
fn given_circuit_broken_when_clear_error_then_stays_circuit_broken() {
    let next = transition(&AuthState::CircuitBroken, AuthEvent::ClearError);

    assert_eq!(next, AuthState::CircuitBroken);
}

#[test]
fn given_each_phase_when_displayed_then_kebab_case_name() {
    assert_eq!(AuthPhase::Idle.to_string(), "idle");
    assert_eq!(AuthPhase::CheckingSession.to_string(), "checking-session");
    assert_eq!(AuthPhase::TimedOut.to_string(), "timed-out");
    assert_eq!(AuthPhase::CircuitBroken.to_string(), "circuit-broken");
}
