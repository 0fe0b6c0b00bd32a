//! Route guards: what a page should show for a given [`AuthState`].
//!
//! The view layer reads the controller's state and asks these functions what to do;
//! it never writes auth state itself.

use crate::machine::AuthState;

use serde::Serialize;

/// Outcome for a page that requires a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteDecision {
    /// Show the circuit-broken page with its reset controls.
    CircuitBrokenPage,
    /// Auth is still being determined.
    Spinner,
    /// Render the protected page.
    Render,
    RedirectToLogin,
}

/// Outcome for the login page itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoginRouteDecision {
    CircuitBrokenPage,
    /// Already signed in, go to the dashboard.
    RedirectHome,
    ShowLogin,
}

pub fn protected_route(state: &AuthState) -> RouteDecision {
    match state {
        AuthState::CircuitBroken => RouteDecision::CircuitBrokenPage,
        AuthState::Idle | AuthState::CheckingSession => RouteDecision::Spinner,
        AuthState::Authenticated { .. } => RouteDecision::Render,
        AuthState::Unauthenticated { .. } | AuthState::TimedOut { .. } => {
            RouteDecision::RedirectToLogin
        }
    }
}

pub fn login_route(state: &AuthState) -> LoginRouteDecision {
    match state {
        AuthState::CircuitBroken => LoginRouteDecision::CircuitBrokenPage,
        AuthState::Authenticated { .. } => LoginRouteDecision::RedirectHome,
        _ => LoginRouteDecision::ShowLogin,
    }
}
