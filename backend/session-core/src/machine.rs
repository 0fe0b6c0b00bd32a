//! Pure authentication state machine.
//!
//! [`transition`] maps `(state, event)` to the next state with no I/O. The controller
//! performs the side effects (storage writes, transport calls) and feeds the outcome
//! back in as an event. Breaker outcomes are decided by the controller before the event
//! is built, so events carry `breaker_tripped` rather than the machine reading storage.
//!
//! Events that do not apply to the current state leave it unchanged. Stale results
//! (an identity arriving after a timeout, for example) are absorbed this way.

use models::Identity;

use serde::Serialize;

/// Discriminant of [`AuthState`], for display and quick comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AuthPhase {
    Idle,
    CheckingSession,
    Authenticated,
    Unauthenticated,
    TimedOut,
    CircuitBroken,
}

impl std::fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuthPhase::Idle => "idle",
            AuthPhase::CheckingSession => "checking-session",
            AuthPhase::Authenticated => "authenticated",
            AuthPhase::Unauthenticated => "unauthenticated",
            AuthPhase::TimedOut => "timed-out",
            AuthPhase::CircuitBroken => "circuit-broken",
        };
        f.write_str(name)
    }
}

/// What the client currently knows about its session.
///
/// Each variant holds only the data that is legal in that phase: a user exists only
/// while authenticated, an error only after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Idle,
    /// A session check or login request is in flight.
    CheckingSession,
    Authenticated {
        user: Identity,
    },
    Unauthenticated {
        last_error: Option<String>,
    },
    TimedOut {
        last_error: String,
    },
    /// Terminal until a manual reset.
    CircuitBroken,
}

impl AuthState {
    pub fn unauthenticated() -> Self {
        AuthState::Unauthenticated { last_error: None }
    }

    pub fn phase(&self) -> AuthPhase {
        match self {
            AuthState::Idle => AuthPhase::Idle,
            AuthState::CheckingSession => AuthPhase::CheckingSession,
            AuthState::Authenticated { .. } => AuthPhase::Authenticated,
            AuthState::Unauthenticated { .. } => AuthPhase::Unauthenticated,
            AuthState::TimedOut { .. } => AuthPhase::TimedOut,
            AuthState::CircuitBroken => AuthPhase::CircuitBroken,
        }
    }

    pub fn user(&self) -> Option<&Identity> {
        match self {
            AuthState::Authenticated { user } => Some(user),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match self {
            AuthState::Unauthenticated { last_error } => last_error.as_deref(),
            AuthState::TimedOut { last_error } => Some(last_error),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, AuthState::Idle | AuthState::CheckingSession)
    }

    pub fn is_circuit_broken(&self) -> bool {
        matches!(self, AuthState::CircuitBroken)
    }
}

/// Inputs to [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// Application start.
    Bootstrap {
        has_token: bool,
        breaker_tripped: bool,
    },
    /// A session check is about to go out (manual retry, or after a breaker reset).
    CheckStarted,
    /// The identity check returned a user.
    IdentityResolved(Identity),
    /// The identity check failed. `breaker_tripped` is the breaker state after the
    /// failure was recorded.
    IdentityRejected {
        message: String,
        breaker_tripped: bool,
    },
    /// The identity check lost the race against the session timeout.
    TimedOut {
        message: String,
        breaker_tripped: bool,
    },
    /// The breaker was found tripped outside of a failure, e.g. left over from an
    /// earlier run.
    BreakerTripped,
    /// Manual reset from the circuit-broken page.
    BreakerReset,
    LoginAttempted {
        breaker_tripped: bool,
    },
    LoginSucceeded(Identity),
    LoginFailed {
        message: String,
        breaker_tripped: bool,
    },
    Logout,
    /// Dismiss the error message without touching the breaker.
    ClearError,
}

/// Compute the next state. Never performs I/O.
pub fn transition(state: &AuthState, event: AuthEvent) -> AuthState {
    use AuthEvent as E;
    use AuthState as S;

    match (state, event) {
        (
            S::Idle,
            E::Bootstrap {
                has_token,
                breaker_tripped,
            },
        ) => {
            if !has_token {
                S::unauthenticated()
            } else if breaker_tripped {
                S::CircuitBroken
            } else {
                S::CheckingSession
            }
        }

        (S::Idle | S::Unauthenticated { .. } | S::TimedOut { .. }, E::CheckStarted) => {
            S::CheckingSession
        }

        (S::CheckingSession, E::IdentityResolved(user)) => S::Authenticated { user },

        (
            S::CheckingSession,
            E::IdentityRejected {
                breaker_tripped: true,
                ..
            },
        ) => S::CircuitBroken,
        (S::CheckingSession, E::IdentityRejected { message, .. }) => S::Unauthenticated {
            last_error: Some(message),
        },

        (
            S::CheckingSession,
            E::TimedOut {
                breaker_tripped: true,
                ..
            },
        ) => S::CircuitBroken,
        (S::CheckingSession, E::TimedOut { message, .. }) => S::TimedOut {
            last_error: message,
        },

        (S::TimedOut { .. } | S::Unauthenticated { .. }, E::BreakerTripped) => S::CircuitBroken,

        (
            _,
            E::LoginAttempted {
                breaker_tripped: true,
            },
        ) => S::CircuitBroken,
        (S::CircuitBroken, E::LoginAttempted { .. }) => S::CircuitBroken,
        (_, E::LoginAttempted { .. }) => S::CheckingSession,

        (S::CheckingSession, E::LoginSucceeded(user)) => S::Authenticated { user },

        (
            S::CheckingSession,
            E::LoginFailed {
                breaker_tripped: true,
                ..
            },
        ) => S::CircuitBroken,
        (S::CheckingSession, E::LoginFailed { message, .. }) => S::Unauthenticated {
            last_error: Some(message),
        },

        (S::CircuitBroken, E::BreakerReset) => S::unauthenticated(),

        (_, E::Logout) => S::unauthenticated(),

        (S::Unauthenticated { .. }, E::ClearError) => S::unauthenticated(),

        (current, _) => current.clone(),
    }
}
