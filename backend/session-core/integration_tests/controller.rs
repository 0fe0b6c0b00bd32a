//! End-to-end behaviour of the session controller over a scripted transport.

use crate::support::{
    CheckReply, LoginReply, MockTransport, Scopes, TEST_CHECK_TIMEOUT, TEST_TOKEN, controller,
    user, wait_for_state,
};

use session_core::store::{ATTEMPTS_KEY, CIRCUIT_BROKEN_KEY, KeyValueStore};
use session_core::{AuthError, AuthPhase, AuthState};

use models::Credentials;

use std::time::Duration;

fn bad_credentials() -> Credentials {
    Credentials::new("a@b.com", "bad")
}

// ============================================
// BOOTSTRAP
// ============================================

#[tokio::test]
async fn given_no_token_when_bootstrapped_then_unauthenticated_without_transport_call() {
    // GIVEN: Empty storage
    let transport = MockTransport::new();
    let scopes = Scopes::empty();
    let controller = controller(&transport, &scopes);

    // WHEN: Bootstrapping
    let state = controller.bootstrap().await;

    // THEN: Login page, /me never called
    assert_eq!(state, AuthState::unauthenticated());
    assert_eq!(transport.check_calls(), 0);
}

#[tokio::test]
async fn given_token_and_valid_session_when_bootstrapped_then_authenticated() {
    // GIVEN: Stored token, /me answers with a user
    let transport = MockTransport::new();
    transport.push_check(CheckReply::Identity(user("1", "A")));
    let scopes = Scopes::with_token();
    let controller = controller(&transport, &scopes);

    // WHEN: Bootstrapping
    let state = controller.bootstrap().await;

    // THEN: Authenticated as that user, token sent, counter clear
    assert_eq!(state.user(), Some(&user("1", "A")));
    assert_eq!(transport.seen_tokens(), vec![TEST_TOKEN.to_string()]);
    assert_eq!(controller.breaker_attempts(), 0);
}

/// **VALUE**: A rejected token is dropped and counted.
///
/// **BUG THIS CATCHES**: Keeping a token the server refused, which would re-send it on
/// every start and walk the cashier straight into the breaker.
#[tokio::test]
async fn given_token_rejected_when_bootstrapped_then_token_cleared_and_failure_counted() {
    // GIVEN: /me refuses the token
    let transport = MockTransport::new();
    transport.push_check(CheckReply::Rejected(401, Some("Token is not valid".to_string())));
    let scopes = Scopes::with_token();
    let controller = controller(&transport, &scopes);

    // WHEN: Bootstrapping
    let state = controller.bootstrap().await;

    // THEN: Unauthenticated with the server's message, token gone, one attempt
    assert_eq!(state.phase(), AuthPhase::Unauthenticated);
    assert_eq!(state.last_error(), Some("Token is not valid"));
    assert_eq!(scopes.token(), None);
    assert_eq!(controller.breaker_attempts(), 1);
}

#[tokio::test]
async fn given_rejection_without_message_when_bootstrapped_then_fallback_error_shown() {
    let transport = MockTransport::new();
    transport.push_check(CheckReply::Rejected(500, None));
    let scopes = Scopes::with_token();
    let controller = controller(&transport, &scopes);

    let state = controller.bootstrap().await;

    assert_eq!(state.last_error(), Some("Authentication failed"));
}

/// **VALUE**: Five rejected starts trip the breaker; the sixth start stays off the wire.
///
/// **WHY THIS MATTERS**: The breaker record lives in the ephemeral scope, which survives
/// a restart of the controller within one client session.
///
/// **BUG THIS CATCHES**: Counting only within one controller instance, or calling `/me`
/// while tripped.
#[tokio::test]
async fn given_five_rejected_restarts_when_sixth_bootstrap_then_circuit_broken_without_call() {
    // GIVEN: Every /me call is rejected (default script)
    let transport = MockTransport::new();
    let scopes = Scopes::empty();

    // WHEN: Five restarts, each with a token present
    let mut phases = Vec::new();
    for _ in 0..5 {
        scopes.store_token();
        phases.push(controller(&transport, &scopes).bootstrap().await.phase());
    }

    // THEN: Four plain rejections, then the fifth failure trips the breaker
    assert_eq!(phases[..4], [AuthPhase::Unauthenticated; 4]);
    assert_eq!(phases[4], AuthPhase::CircuitBroken);
    assert_eq!(transport.check_calls(), 5);
    assert_eq!(scopes.ephemeral.get(CIRCUIT_BROKEN_KEY).as_deref(), Some("true"));
    assert_eq!(scopes.ephemeral.get(ATTEMPTS_KEY).as_deref(), Some("5"));

    // WHEN: A sixth start with a token
    scopes.store_token();
    let sixth = controller(&transport, &scopes).bootstrap().await;

    // THEN: Circuit broken straight away, no transport call
    assert_eq!(sixth, AuthState::CircuitBroken);
    assert_eq!(transport.check_calls(), 5);
}

#[tokio::test]
async fn given_counter_at_threshold_without_flag_when_bootstrapped_then_flag_repaired() {
    // GIVEN: An earlier run stopped after counting the fifth failure
    let transport = MockTransport::new();
    let scopes = Scopes::with_token();
    scopes.ephemeral.set(ATTEMPTS_KEY, "5");
    let controller = controller(&transport, &scopes);

    // WHEN: Bootstrapping
    let state = controller.bootstrap().await;

    // THEN: Treated as tripped
    assert_eq!(state, AuthState::CircuitBroken);
    assert!(controller.is_breaker_tripped());
    assert_eq!(transport.check_calls(), 0);
}

/// **VALUE**: Bootstrap runs once even when triggered repeatedly.
///
/// **BUG THIS CATCHES**: Several mount-time triggers each firing `/me`, which burns
/// through breaker attempts in a single start.
#[tokio::test]
async fn given_concurrent_bootstraps_when_run_then_single_transport_call() {
    // GIVEN: Slow /me
    let transport = MockTransport::new();
    transport.push_check_after(Duration::from_millis(50), CheckReply::Identity(user("1", "A")));
    let scopes = Scopes::with_token();
    let controller = controller(&transport, &scopes);

    // WHEN: Three triggers at once, then one more afterwards
    let (a, b, c) = tokio::join!(
        controller.bootstrap(),
        controller.bootstrap(),
        controller.bootstrap()
    );
    let _ = (a, b, c);
    let after = controller.bootstrap().await;

    // THEN: One call, authenticated
    assert_eq!(transport.check_calls(), 1);
    assert!(after.is_authenticated());
}

#[tokio::test]
async fn given_check_in_flight_when_recheck_requested_then_ignored() {
    let transport = MockTransport::new();
    transport.push_check_after(Duration::from_millis(80), CheckReply::Identity(user("1", "A")));
    let scopes = Scopes::with_token();
    let controller = controller(&transport, &scopes);

    let background = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.bootstrap().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let during = controller.recheck_session().await;
    let finished = background.await.unwrap();

    assert_eq!(during, AuthState::CheckingSession);
    assert!(finished.is_authenticated());
    assert_eq!(transport.check_calls(), 1);
}

// ============================================
// TIMEOUT RACE
// ============================================

/// **VALUE**: A `/me` that never answers ends in `TimedOut`, keeps the token and counts
/// one failure.
///
/// **BUG THIS CATCHES**: An infinite spinner when the API hangs, or logging the cashier
/// out because the network was slow.
#[tokio::test]
async fn given_hanging_session_check_when_bootstrapped_then_timed_out_and_token_kept() {
    // GIVEN: /me never answers
    let transport = MockTransport::new();
    transport.push_check(CheckReply::Pending);
    let scopes = Scopes::with_token();
    let controller = controller(&transport, &scopes);

    // WHEN: Bootstrapping
    let started = tokio::time::Instant::now();
    let state = controller.bootstrap().await;

    // THEN: Timed out after the race window
    assert_eq!(state.phase(), AuthPhase::TimedOut);
    assert_eq!(state.last_error(), Some("Session check timed out"));
    assert!(started.elapsed() >= TEST_CHECK_TIMEOUT);
    assert_eq!(scopes.token().as_deref(), Some(TEST_TOKEN));
    assert_eq!(controller.breaker_attempts(), 1);
}

#[tokio::test]
async fn given_identity_arriving_after_timeout_when_waited_then_state_stays_timed_out() {
    // GIVEN: /me answers, but only after the race window
    let transport = MockTransport::new();
    transport.push_check_after(
        TEST_CHECK_TIMEOUT * 2,
        CheckReply::Identity(user("1", "A")),
    );
    let scopes = Scopes::with_token();
    let controller = controller(&transport, &scopes);

    // WHEN: Bootstrapping and waiting past the late answer
    let state = controller.bootstrap().await;
    tokio::time::sleep(TEST_CHECK_TIMEOUT * 3).await;

    // THEN: Still timed out
    assert_eq!(state.phase(), AuthPhase::TimedOut);
    assert_eq!(controller.state().phase(), AuthPhase::TimedOut);
}

#[tokio::test]
async fn given_timed_out_when_rechecked_successfully_then_authenticated_and_counter_reset() {
    let transport = MockTransport::new();
    transport.push_check(CheckReply::Pending);
    transport.push_check(CheckReply::Identity(user("1", "A")));
    let scopes = Scopes::with_token();
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;

    let state = controller.recheck_session().await;

    assert!(state.is_authenticated());
    assert_eq!(controller.breaker_attempts(), 0);
}

// ============================================
// LOGIN
// ============================================

#[tokio::test]
async fn given_valid_credentials_when_login_then_token_stored_and_authenticated() {
    // GIVEN: Signed out, server accepts the login
    let transport = MockTransport::new();
    transport.push_login(LoginReply::Success("fresh-token".to_string(), user("7", "Sam")));
    let scopes = Scopes::empty();
    scopes.ephemeral.set(ATTEMPTS_KEY, "3");
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;

    // WHEN: Logging in
    let result = controller
        .login(Credentials::new("sam@shop.com", "secret"))
        .await;

    // THEN: Token persisted, counter reset, authenticated
    assert_eq!(result.unwrap(), user("7", "Sam"));
    assert_eq!(scopes.token().as_deref(), Some("fresh-token"));
    assert_eq!(controller.breaker_attempts(), 0);
    assert_eq!(controller.state().user(), Some(&user("7", "Sam")));
}

/// **VALUE**: A refused login shows the server's message and counts one failure.
///
/// **BUG THIS CATCHES**: Swallowing the server message, or storing a token on failure.
#[tokio::test]
async fn given_bad_password_when_login_then_server_message_shown_and_attempt_counted() {
    // GIVEN: Server refuses with "Invalid credentials" (default script)
    let transport = MockTransport::new();
    let scopes = Scopes::empty();
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;

    // WHEN: Logging in with a bad password
    let result = controller.login(bad_credentials()).await;

    // THEN: Error surfaced, one attempt, no token
    let error = result.unwrap_err();
    assert_eq!(error.user_message(), "Invalid credentials");
    assert_eq!(
        controller.state(),
        AuthState::Unauthenticated {
            last_error: Some("Invalid credentials".to_string())
        }
    );
    assert_eq!(controller.breaker_attempts(), 1);
    assert_eq!(scopes.token(), None);
}

#[tokio::test]
async fn given_empty_fields_when_login_then_rejected_locally_without_counting() {
    let transport = MockTransport::new();
    let scopes = Scopes::empty();
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;

    let result = controller.login(Credentials::new("", "")).await;

    assert!(matches!(result, Err(AuthError::InvalidCredentials { .. })));
    assert_eq!(transport.login_calls(), 0);
    assert_eq!(controller.breaker_attempts(), 0);
    assert_eq!(controller.state(), AuthState::unauthenticated());
}

/// **VALUE**: The fifth failed login trips the breaker and later logins never leave
/// the client.
///
/// **BUG THIS CATCHES**: Firing the trip side effect twice, or sending a sixth login.
#[tokio::test]
async fn given_five_failed_logins_when_sixth_attempted_then_blocked_locally() {
    // GIVEN: Five refused logins
    let transport = MockTransport::new();
    let scopes = Scopes::empty();
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;
    for _ in 0..5 {
        let _ = controller.login(bad_credentials()).await;
    }
    assert_eq!(controller.state(), AuthState::CircuitBroken);

    // WHEN: A sixth attempt
    let result = controller.login(bad_credentials()).await;

    // THEN: Refused without a request, breaker entered exactly once
    assert!(matches!(result, Err(AuthError::CircuitBroken { .. })));
    assert_eq!(transport.login_calls(), 5);
    assert_eq!(controller.trip_count(), 1);
}

#[tokio::test]
async fn given_login_in_flight_when_logout_then_login_result_discarded() {
    // GIVEN: Slow successful login
    let transport = MockTransport::new();
    transport.push_login_after(
        Duration::from_millis(100),
        LoginReply::Success("late-token".to_string(), user("7", "Sam")),
    );
    let scopes = Scopes::empty();
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .login(Credentials::new("sam@shop.com", "secret"))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // WHEN: Logging out before the answer arrives
    controller.logout().await;
    let result = pending.await.unwrap();

    // THEN: Late token never lands
    assert!(matches!(result, Err(AuthError::Superseded { .. })));
    assert_eq!(scopes.token(), None);
    assert_eq!(controller.state(), AuthState::unauthenticated());
}

// ============================================
// LOGOUT AND RESETS
// ============================================

#[tokio::test]
async fn given_authenticated_when_logout_then_token_and_breaker_cleared() {
    let transport = MockTransport::new();
    transport.push_check(CheckReply::Identity(user("1", "A")));
    let scopes = Scopes::with_token();
    scopes.ephemeral.set(ATTEMPTS_KEY, "2");
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;

    let state = controller.logout().await;

    assert_eq!(state, AuthState::unauthenticated());
    assert_eq!(scopes.token(), None);
    assert_eq!(controller.breaker_attempts(), 0);
}

#[tokio::test]
async fn given_session_check_in_flight_when_logout_then_late_identity_discarded() {
    let transport = MockTransport::new();
    transport.push_check_after(Duration::from_millis(80), CheckReply::Identity(user("1", "A")));
    let scopes = Scopes::with_token();
    let controller = controller(&transport, &scopes);

    let background = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.bootstrap().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.logout().await;
    background.await.unwrap();

    assert_eq!(controller.state(), AuthState::unauthenticated());
    assert_eq!(controller.breaker_attempts(), 0);
}

/// **VALUE**: A breaker reset that lands while the startup check is running leaves the
/// check in charge of the outcome.
///
/// **BUG THIS CATCHES**: The reset discarding the pending result while the state stays
/// `CheckingSession`, leaving the spinner up forever with retries ignored.
#[tokio::test]
async fn given_session_check_in_flight_when_breaker_reset_then_check_still_settles() {
    // GIVEN: Slow /me answer and a couple of earlier failures on record
    let transport = MockTransport::new();
    transport.push_check_after(Duration::from_millis(80), CheckReply::Identity(user("1", "A")));
    let scopes = Scopes::with_token();
    scopes.ephemeral.set(ATTEMPTS_KEY, "2");
    let controller = controller(&transport, &scopes);

    let background = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.bootstrap().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // WHEN: Resetting the breaker and asking for a retry mid-check
    let during = controller.reset_breaker().await;
    controller.recheck_session().await;
    let boot = background.await.unwrap();

    // THEN: The reset left the busy state alone and the check resolved it
    assert_eq!(during, AuthState::CheckingSession);
    assert_eq!(boot.user(), Some(&user("1", "A")));
    assert!(controller.state().is_authenticated());
    assert_eq!(controller.breaker_attempts(), 0);
    assert_eq!(transport.check_calls(), 1);
}

#[tokio::test]
async fn given_rejected_check_in_flight_when_breaker_reset_then_rejection_recorded() {
    let transport = MockTransport::new();
    transport.push_check_after(
        Duration::from_millis(80),
        CheckReply::Rejected(401, Some("Token is not valid".to_string())),
    );
    let scopes = Scopes::with_token();
    scopes.ephemeral.set(ATTEMPTS_KEY, "3");
    let controller = controller(&transport, &scopes);

    let background = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.bootstrap().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.reset_breaker().await;
    let settled = background.await.unwrap();

    assert_eq!(settled.phase(), AuthPhase::Unauthenticated);
    assert_eq!(settled.last_error(), Some("Token is not valid"));
    assert_eq!(scopes.token(), None);
    assert_eq!(controller.breaker_attempts(), 1);
}

/// **VALUE**: A breaker reset during a login does not swallow the login result.
///
/// **BUG THIS CATCHES**: The login answer being thrown away as stale, so the cashier
/// is stuck on a busy screen with a valid token never stored.
#[tokio::test]
async fn given_login_in_flight_when_breaker_reset_then_login_completes() {
    // GIVEN: Slow successful login
    let transport = MockTransport::new();
    transport.push_login_after(
        Duration::from_millis(80),
        LoginReply::Success(TEST_TOKEN.to_string(), user("7", "Sam")),
    );
    let scopes = Scopes::empty();
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .login(Credentials::new("sam@shop.com", "secret"))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // WHEN: Resetting the breaker before the answer arrives
    let during = controller.reset_breaker().await;
    let result = pending.await.unwrap();

    // THEN: Login lands as usual
    assert_eq!(during, AuthState::CheckingSession);
    assert_eq!(result.unwrap(), user("7", "Sam"));
    assert!(controller.state().is_authenticated());
    assert_eq!(scopes.token().as_deref(), Some(TEST_TOKEN));
    assert_eq!(transport.check_calls(), 0);
}

#[tokio::test]
async fn given_failing_login_in_flight_when_errors_cleared_then_failure_still_shown() {
    let transport = MockTransport::new();
    transport.push_login_after(
        Duration::from_millis(80),
        LoginReply::Rejected(400, Some("Invalid credentials".to_string())),
    );
    let scopes = Scopes::empty();
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.login(bad_credentials()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let during = controller.clear_errors().await;
    let result = pending.await.unwrap();

    assert_eq!(during, AuthState::CheckingSession);
    assert!(result.is_err());
    assert_eq!(controller.state().phase(), AuthPhase::Unauthenticated);
    assert!(controller.state().last_error().is_some());
    assert_eq!(controller.breaker_attempts(), 1);
}

/// **VALUE**: Resetting the breaker with a token still stored re-runs the session check.
///
/// **BUG THIS CATCHES**: A cashier stuck on the login page after a reset even though
/// their token is still good.
#[tokio::test]
async fn given_circuit_broken_with_token_when_breaker_reset_then_session_rechecked() {
    // GIVEN: Tripped breaker, token present, /me now healthy
    let transport = MockTransport::new();
    transport.push_check(CheckReply::Identity(user("1", "A")));
    let scopes = Scopes::with_token();
    scopes.ephemeral.set(ATTEMPTS_KEY, "5");
    scopes.ephemeral.set(CIRCUIT_BROKEN_KEY, "true");
    let controller = controller(&transport, &scopes);
    assert_eq!(controller.bootstrap().await, AuthState::CircuitBroken);

    // WHEN: Resetting
    let immediate = controller.reset_breaker().await;

    // THEN: Unauthenticated at once, then authenticated by the background check
    assert_eq!(immediate.phase(), AuthPhase::Unauthenticated);
    let settled = wait_for_state(&controller, AuthState::is_authenticated).await;
    assert_eq!(settled.user(), Some(&user("1", "A")));
    assert_eq!(transport.check_calls(), 1);
    assert!(!controller.is_breaker_tripped());
}

#[tokio::test]
async fn given_circuit_broken_without_token_when_breaker_reset_then_no_check_issued() {
    let transport = MockTransport::new();
    let scopes = Scopes::empty();
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;
    for _ in 0..5 {
        let _ = controller.login(bad_credentials()).await;
    }

    let state = controller.reset_breaker().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(state, AuthState::unauthenticated());
    assert_eq!(transport.check_calls(), 0);
    assert_eq!(controller.breaker_attempts(), 0);
}

#[tokio::test]
async fn given_clear_breaker_when_reset_twice_then_nothing_changes() {
    let transport = MockTransport::new();
    let scopes = Scopes::empty();
    let controller = controller(&transport, &scopes);
    let before = controller.bootstrap().await;

    let first = controller.reset_breaker().await;
    let second = controller.reset_breaker().await;

    assert_eq!(first, before);
    assert_eq!(second, before);
    assert_eq!(transport.check_calls(), 0);
}

#[tokio::test]
async fn given_stored_data_when_clear_all_storage_then_both_scopes_empty() {
    let transport = MockTransport::new();
    let scopes = Scopes::with_token();
    scopes.persistent.set("preferred_register", "2");
    scopes.ephemeral.set(ATTEMPTS_KEY, "5");
    scopes.ephemeral.set(CIRCUIT_BROKEN_KEY, "true");
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;

    let state = controller.reset_breaker_and_clear_all_storage().await;

    assert_eq!(state, AuthState::unauthenticated());
    assert!(scopes.persistent.is_empty());
    assert!(scopes.ephemeral.is_empty());
    assert_eq!(transport.check_calls(), 0);
}

#[tokio::test]
async fn given_error_shown_when_errors_cleared_then_message_gone_and_count_kept() {
    let transport = MockTransport::new();
    let scopes = Scopes::empty();
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;
    let _ = controller.login(bad_credentials()).await;

    let state = controller.clear_errors().await;

    assert_eq!(state.last_error(), None);
    assert_eq!(controller.breaker_attempts(), 1);
}

#[tokio::test]
async fn given_shut_down_controller_when_breaker_reset_then_no_background_check() {
    let transport = MockTransport::new();
    transport.push_check(CheckReply::Identity(user("1", "A")));
    let scopes = Scopes::with_token();
    scopes.ephemeral.set(CIRCUIT_BROKEN_KEY, "true");
    let controller = controller(&transport, &scopes);
    controller.bootstrap().await;

    controller.shutdown();
    let state = controller.reset_breaker().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(state.phase(), AuthPhase::Unauthenticated);
    assert_eq!(transport.check_calls(), 0);
}

#[tokio::test]
async fn given_state_changes_when_subscribed_then_each_phase_observed_once() {
    // GIVEN: A subscriber attached before bootstrap
    let transport = MockTransport::new();
    transport.push_check(CheckReply::Identity(user("1", "A")));
    let scopes = Scopes::with_token();
    let controller = controller(&transport, &scopes);
    let mut rx = controller.subscribe();

    // WHEN: Bootstrapping, then clearing errors (no-op in this state)
    controller.bootstrap().await;
    rx.borrow_and_update();
    controller.clear_errors().await;

    // THEN: The no-op was not broadcast
    assert!(!rx.has_changed().unwrap());
}
