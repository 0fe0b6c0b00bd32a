use super::report::StatusReport;
use crate::session::SessionContext;

use session_core::AuthState;

use std::time::Duration;

use log::{info, warn};

/// Extra time on top of the check timeout before giving up on a settled state.
const SETTLE_MARGIN: Duration = Duration::from_millis(500);

/// Reset the circuit breaker, re-checking the stored token if there is one.
///
/// With `clear_all`, both storage scopes are wiped instead and nothing is re-checked.
pub async fn reset(context: &SessionContext, clear_all: bool) -> StatusReport {
    let controller = &context.controller;

    if clear_all {
        let state = controller.reset_breaker_and_clear_all_storage().await;
        return StatusReport::capture(context, &state);
    }

    // Loads the breaker record so the reset starts from the real state.
    controller.bootstrap().await;
    controller.reset_breaker().await;

    let mut state = controller.recheck_session().await;
    if state.is_busy() {
        state = wait_until_settled(context).await;
    }

    info!("Breaker reset, session is {}", state.phase());
    StatusReport::capture(context, &state)
}

/// Wait for a background session check to finish.
async fn wait_until_settled(context: &SessionContext) -> AuthState {
    let controller = &context.controller;
    let deadline = controller.settings().check_timeout + SETTLE_MARGIN;
    let mut rx = controller.subscribe();

    match tokio::time::timeout(deadline, rx.wait_for(|state| !state.is_busy())).await {
        Ok(Ok(state)) => state.clone(),
        _ => {
            warn!("Session check did not settle within {deadline:?}");
            controller.state()
        }
    }
}
