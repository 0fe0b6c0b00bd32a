use crate::commands::Report;
use crate::commands::report::StatusReport;

use session_core::guard::{LoginRouteDecision, RouteDecision};
use session_core::machine::AuthPhase;

use models::Identity;

fn report(phase: AuthPhase, dashboard: RouteDecision) -> StatusReport {
    StatusReport {
        phase,
        user: None,
        last_error: None,
        has_token: false,
        failed_attempts: 0,
        breaker_tripped: false,
        dashboard,
        login_page: LoginRouteDecision::ShowLogin,
        api_base_url: "http://localhost:3000".to_string(),
    }
}

#[test]
fn given_circuit_broken_when_rendered_then_reset_instructions_shown() {
    let mut status = report(AuthPhase::CircuitBroken, RouteDecision::CircuitBrokenPage);
    status.breaker_tripped = true;
    status.failed_attempts = 5;

    let text = status.render_text();

    assert!(text.contains("Too many failed attempts"));
    assert!(text.contains("pos-session reset --clear-all"));
    assert!(!text.contains("Failed attempts:"));
}

#[test]
fn given_authenticated_when_rendered_then_name_and_role_shown() {
    let mut status = report(AuthPhase::Authenticated, RouteDecision::Render);
    status.user = Some(Identity::new("1", "Dana").with_role("cashier"));

    assert_eq!(status.render_text(), "Signed in as Dana (cashier)\n");
}

/// **VALUE**: The login page's error text reaches the terminal.
///
/// **BUG THIS CATCHES**: A failed login that prints only "Not signed in." with no reason.
#[test]
fn given_unauthenticated_with_error_when_rendered_then_error_and_attempts_shown() {
    let mut status = report(AuthPhase::Unauthenticated, RouteDecision::RedirectToLogin);
    status.last_error = Some("Invalid credentials".to_string());
    status.failed_attempts = 2;

    let text = status.render_text();

    assert!(text.starts_with("Not signed in.\nInvalid credentials\n"));
    assert!(text.contains("Failed attempts: 2"));
}

#[test]
fn given_json_requested_when_rendered_then_fields_serialized_flat() {
    let status = report(AuthPhase::TimedOut, RouteDecision::RedirectToLogin);

    let json = Report::Status(status).render(true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["phase"], "TimedOut");
    assert_eq!(value["dashboard"], "RedirectToLogin");
    assert_eq!(value["login_page"], "ShowLogin");
}
