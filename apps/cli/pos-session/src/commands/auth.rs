use super::report::StatusReport;
use crate::error::PosSessionError;
use crate::session::SessionContext;

use session_core::AuthError;
use session_core::guard::{LoginRouteDecision, login_route};

use models::Credentials;

use log::info;

/// Run the startup check and report the result.
pub async fn status(context: &SessionContext) -> StatusReport {
    let state = context.controller.bootstrap().await;
    StatusReport::capture(context, &state)
}

/// Sign in, unless the stored session is already good.
///
/// # Errors
///
/// Returns [`PosSessionError::Auth`] carrying the message the login page would show.
pub async fn login(
    context: &SessionContext,
    email: String,
    password: String,
) -> Result<StatusReport, PosSessionError> {
    let controller = &context.controller;
    let state = controller.bootstrap().await;

    match login_route(&state) {
        LoginRouteDecision::RedirectHome => {
            info!("Already signed in, skipping login");
            return Ok(StatusReport::capture(context, &state));
        }
        LoginRouteDecision::CircuitBrokenPage => {
            return Err(AuthError::circuit_broken().into());
        }
        LoginRouteDecision::ShowLogin => {}
    }

    controller
        .login(Credentials::new(email, password))
        .await?;

    Ok(StatusReport::capture(context, &controller.state()))
}

pub async fn logout(context: &SessionContext) -> StatusReport {
    let state = context.controller.logout().await;
    StatusReport::capture(context, &state)
}
