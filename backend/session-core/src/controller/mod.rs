//! Session controller: the single owner of the client's authentication state.
//!
//! Sequences the bootstrap check, login, logout and circuit-breaker reset, and is the
//! only writer of the token and breaker stores.
//!
//! # Ordering
//!
//! - Every logical step (read breaker, record failure, transition, publish) runs under
//!   `step` with no `.await` inside, so breaker reads and writes cannot interleave.
//! - At most one session check is in flight ([`InFlightGuard`]); a second trigger is a
//!   no-op.
//! - Every check and login captures the current epoch before awaiting the transport.
//!   Logout, login and resets bump the epoch, so a result that comes back after one of
//!   those is discarded.
//! - The session check is raced against `check_timeout`; whichever side loses is
//!   dropped, so a late identity can never land after `TimedOut`.

pub(crate) mod in_flight;

use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::machine::{AuthEvent, AuthState, transition};
use crate::store::{BreakerStore, DEFAULT_TRIP_THRESHOLD, KeyValueStore, TokenStore};
use crate::transport::SessionTransport;

use in_flight::InFlightGuard;

use common::SessionToken;
use models::{Credentials, Identity};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// Default race window for the bootstrap identity check.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// How long the identity check may take before the session counts as timed out.
    pub check_timeout: Duration,
    /// Consecutive failures that trip the breaker.
    pub trip_threshold: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            trip_threshold: DEFAULT_TRIP_THRESHOLD,
        }
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            check_timeout: config.check_timeout(),
            trip_threshold: config.trip_threshold,
        }
    }
}

/// Handle to the session controller.
///
/// `Clone` and cheap to share; all clones drive the same state.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    settings: SessionSettings,
    transport: Arc<dyn SessionTransport>,
    tokens: TokenStore,
    breaker: BreakerStore,
    state_tx: watch::Sender<AuthState>,
    step: Mutex<()>,
    epoch: AtomicU64,
    check_in_flight: Arc<AtomicBool>,
    bootstrapped: AtomicBool,
    shut_down: AtomicBool,
    trips: AtomicU64,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

/// What asked for a session check.
#[derive(Debug, Clone, Copy)]
enum CheckTrigger {
    Bootstrap,
    Retry,
}

/// How a single session check ended.
enum CheckOutcome {
    Resolved(Identity),
    Rejected(AuthError),
    TimedOut(AuthError),
}

impl SessionController {
    /// Build a controller over the two storage scopes.
    ///
    /// `persistent` holds the bearer token; `ephemeral` holds the breaker record.
    pub fn new(
        settings: SessionSettings,
        transport: Arc<dyn SessionTransport>,
        persistent: Arc<dyn KeyValueStore>,
        ephemeral: Arc<dyn KeyValueStore>,
    ) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Idle);

        Self {
            inner: Arc::new(Inner {
                settings,
                transport,
                tokens: TokenStore::new(persistent),
                breaker: BreakerStore::with_threshold(ephemeral, settings.trip_threshold),
                state_tx,
                step: Mutex::new(()),
                epoch: AtomicU64::new(0),
                check_in_flight: Arc::new(AtomicBool::new(false)),
                bootstrapped: AtomicBool::new(false),
                shut_down: AtomicBool::new(false),
                trips: AtomicU64::new(0),
                tasks: StdMutex::new(Vec::new()),
            }),
        }
    }

    pub fn settings(&self) -> SessionSettings {
        self.inner.settings
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.inner.state_tx.borrow().clone()
    }

    /// Receive every state change. Unchanged transitions are not broadcast.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state_tx.subscribe()
    }

    pub fn has_token(&self) -> bool {
        self.inner.tokens.has_token()
    }

    pub fn breaker_attempts(&self) -> u32 {
        self.inner.breaker.attempts()
    }

    pub fn is_breaker_tripped(&self) -> bool {
        self.inner.breaker.is_broken()
    }

    /// Number of times the state entered `CircuitBroken` during this controller's life.
    pub fn trip_count(&self) -> u64 {
        self.inner.trips.load(Ordering::Acquire)
    }

    /// Run the startup check. Only the first call does anything; later calls return the
    /// current state.
    pub async fn bootstrap(&self) -> AuthState {
        if self.inner.bootstrapped.swap(true, Ordering::AcqRel) {
            debug!("[auth] Bootstrap already ran, ignoring");
            return self.state();
        }

        self.run_session_check(CheckTrigger::Bootstrap).await;
        self.state()
    }

    /// Manual retry from a timed-out or signed-out screen.
    ///
    /// Does nothing without a token, while the breaker is tripped, or while another
    /// check is running.
    pub async fn recheck_session(&self) -> AuthState {
        self.run_session_check(CheckTrigger::Retry).await;
        self.state()
    }

    /// Exchange credentials for a token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] if the form is incomplete (no request made,
    ///   not counted toward the breaker)
    /// - [`AuthError::CircuitBroken`] if the breaker is tripped (no request made)
    /// - any transport error; the failure is counted and surfaced in `last_error`
    pub async fn login(&self, credentials: Credentials) -> Result<Identity, AuthError> {
        if let Err(e) = credentials.validate() {
            let error = AuthError::from(e);
            info!("[auth] Login form rejected: {}", error.user_message());
            return Err(error);
        }

        let epoch = {
            let _step = self.inner.step.lock().await;
            let breaker_tripped = self.inner.breaker.is_broken();
            let state = self.apply(AuthEvent::LoginAttempted { breaker_tripped });

            if state.is_circuit_broken() {
                warn!("[auth] Circuit breaker active - login blocked");
                return Err(AuthError::circuit_broken());
            }

            self.bump_epoch()
        };

        info!("[auth] Attempting login for {}", credentials.email);
        let result = self.inner.transport.login(&credentials).await;

        let _step = self.inner.step.lock().await;
        if !self.is_current(epoch) {
            debug!("[auth] Discarding login result superseded by a newer action");
            return Err(AuthError::superseded());
        }

        match result {
            Ok(success) => {
                self.inner.tokens.set_token(&success.token);
                self.inner.breaker.reset();
                info!("[auth] Login successful for {}", success.user.name);
                self.apply(AuthEvent::LoginSucceeded(success.user.clone()));
                Ok(success.user)
            }
            Err(error) => {
                let message = error.user_message();
                warn!(
                    "[auth] Login failed ({}): {}",
                    error.error_category(),
                    message
                );
                let breaker_tripped = if error.counts_toward_breaker() {
                    self.record_failure()
                } else {
                    self.inner.breaker.is_broken()
                };
                self.apply(AuthEvent::LoginFailed {
                    message,
                    breaker_tripped,
                });
                Err(error)
            }
        }
    }

    /// Sign out: clear the token and the breaker record.
    pub async fn logout(&self) -> AuthState {
        let _step = self.inner.step.lock().await;
        info!("[auth] Logging out");
        self.bump_epoch();
        self.inner.tokens.clear_token();
        self.inner.breaker.reset();
        self.apply(AuthEvent::Logout)
    }

    /// Dismiss the current error message. The failure count is kept.
    pub async fn clear_errors(&self) -> AuthState {
        let _step = self.inner.step.lock().await;
        self.apply(AuthEvent::ClearError)
    }

    /// Reset the breaker from the circuit-broken page.
    ///
    /// The state becomes `Unauthenticated`. If the breaker was tripped and a token is
    /// still stored, a session check is issued in the background.
    ///
    /// While a check or login is in flight only the stored record is cleared; the
    /// pending request still owns the busy state and settles it.
    pub async fn reset_breaker(&self) -> AuthState {
        let (state, retry) = {
            let _step = self.inner.step.lock().await;
            let current = self.state();
            if current.is_busy() {
                info!("[auth] Resetting circuit breaker record, request still in flight");
                self.inner.breaker.reset();
                return current;
            }

            let was_broken = self.inner.breaker.is_broken() || current.is_circuit_broken();

            info!("[auth] Manually resetting circuit breaker");
            self.bump_epoch();
            self.inner.breaker.reset();
            let state = self.apply(AuthEvent::BreakerReset);

            (state, was_broken && self.inner.tokens.has_token())
        };

        if retry {
            info!("[auth] Circuit breaker was reset - retrying auth");
            self.spawn_session_check();
        }

        state
    }

    /// Reset the breaker and wipe both storage scopes entirely.
    pub async fn reset_breaker_and_clear_all_storage(&self) -> AuthState {
        let _step = self.inner.step.lock().await;
        warn!("[auth] Clearing all stored auth data");
        self.bump_epoch();
        self.inner.tokens.clear_scope();
        self.inner.breaker.clear_scope();
        self.apply(AuthEvent::Logout)
    }

    /// Cancel background checks. Results still in flight are discarded.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        self.bump_epoch();
        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
        debug!("[auth] Session controller shut down");
    }

    fn spawn_session_check(&self) {
        if self.inner.shut_down.load(Ordering::Acquire) {
            debug!("[auth] Controller shut down, not spawning session check");
            return;
        }

        let controller = self.clone();
        let handle = tokio::spawn(async move {
            controller.run_session_check(CheckTrigger::Retry).await;
        });

        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    async fn run_session_check(&self, trigger: CheckTrigger) {
        let Some(_in_flight) = InFlightGuard::claim(&self.inner.check_in_flight) else {
            debug!("[auth] Session check already in flight, ignoring");
            return;
        };

        let (token, epoch) = {
            let _step = self.inner.step.lock().await;

            if self.inner.shut_down.load(Ordering::Acquire) {
                return;
            }

            let before = self.state();
            let event = match trigger {
                CheckTrigger::Bootstrap => self.bootstrap_event(),
                CheckTrigger::Retry => {
                    if self.inner.breaker.is_broken() {
                        warn!("[auth] Circuit breaker active - skipping auth check");
                        self.apply(AuthEvent::BreakerTripped);
                        return;
                    }
                    if !self.inner.tokens.has_token() {
                        debug!("[auth] No token found, nothing to check");
                        return;
                    }
                    AuthEvent::CheckStarted
                }
            };

            let after = self.apply(event);
            // A login may already own the busy state; leave it alone.
            if matches!(before, AuthState::CheckingSession)
                || !matches!(after, AuthState::CheckingSession)
            {
                return;
            }

            let Some(token) = self.inner.tokens.get_token() else {
                return;
            };

            (token, self.bump_epoch())
        };

        debug!("[auth] Loading user data...");
        let outcome = self.check_with_timeout(&token).await;

        let _step = self.inner.step.lock().await;
        if !self.is_current(epoch) {
            debug!("[auth] Discarding stale session check result");
            return;
        }

        match outcome {
            CheckOutcome::Resolved(user) => {
                info!("[auth] User loaded successfully");
                self.inner.breaker.reset();
                self.apply(AuthEvent::IdentityResolved(user));
            }
            CheckOutcome::Rejected(error) => {
                if error.is_rejection() {
                    warn!("[auth] Token rejected by server: {error}");
                } else {
                    warn!("[auth] Session check failed ({}): {error}", error.error_category());
                }
                self.inner.tokens.clear_token();
                let breaker_tripped = self.record_failure();
                self.apply(AuthEvent::IdentityRejected {
                    message: error.session_message(),
                    breaker_tripped,
                });
            }
            CheckOutcome::TimedOut(error) => {
                warn!("[auth] {error}");
                let breaker_tripped = self.record_failure();
                self.apply(AuthEvent::TimedOut {
                    message: error.session_message(),
                    breaker_tripped,
                });
            }
        }
    }

    /// Build the startup event from storage. Must be called under `step`.
    fn bootstrap_event(&self) -> AuthEvent {
        let breaker = &self.inner.breaker;

        // A counter at the threshold without the flag means an earlier run stopped
        // between the two writes.
        if !breaker.is_broken() && breaker.attempts() >= breaker.trip_threshold() {
            warn!("[auth] Attempts already at threshold - tripping breaker");
            breaker.trip();
        }

        let has_token = self.inner.tokens.has_token();
        let breaker_tripped = breaker.is_broken();

        if !has_token {
            debug!("[auth] No token found");
        } else if breaker_tripped {
            warn!("[auth] Circuit breaker active - skipping auth check");
        }

        AuthEvent::Bootstrap {
            has_token,
            breaker_tripped,
        }
    }

    /// Race the identity check against the session timeout. The loser is dropped.
    async fn check_with_timeout(&self, token: &SessionToken) -> CheckOutcome {
        let check_timeout = self.inner.settings.check_timeout;

        match tokio::time::timeout(check_timeout, self.inner.transport.check_session(token)).await
        {
            Ok(Ok(user)) => CheckOutcome::Resolved(user),
            Ok(Err(error)) => CheckOutcome::Rejected(error),
            Err(_elapsed) => {
                let timeout_ms = u64::try_from(check_timeout.as_millis()).unwrap_or(u64::MAX);
                CheckOutcome::TimedOut(AuthError::timeout(timeout_ms))
            }
        }
    }

    /// Count a failure; returns whether the breaker is tripped afterwards.
    ///
    /// Must be called under `step`.
    fn record_failure(&self) -> bool {
        let breaker = &self.inner.breaker;
        let was_broken = breaker.is_broken();
        let attempts = breaker.record_failure();
        let broken = breaker.is_broken();

        if broken && !was_broken {
            warn!("[auth] Too many failed attempts ({attempts}) - breaking circuit");
        } else {
            debug!(
                "[auth] Failed attempts: {attempts}/{}",
                breaker.trip_threshold()
            );
        }

        broken
    }

    /// Run `event` through the state machine and publish the result if it changed.
    fn apply(&self, event: AuthEvent) -> AuthState {
        let trips = &self.inner.trips;

        self.inner.state_tx.send_if_modified(|state| {
            let next = transition(state, event);
            if next == *state {
                return false;
            }

            info!("[auth] {} -> {}", state.phase(), next.phase());
            if next.is_circuit_broken() {
                trips.fetch_add(1, Ordering::AcqRel);
            }
            *state = next;
            true
        });

        self.state()
    }

    fn bump_epoch(&self) -> u64 {
        self.inner.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner.epoch.load(Ordering::Acquire) == epoch
    }
}
