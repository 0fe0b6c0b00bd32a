//! Test helpers for controller integration tests.
//!
//! This module provides:
//! - A scripted [`SessionTransport`] that counts calls and can delay or never answer
//! - Shared in-memory storage scopes that outlive a controller ("app restarts")
//! - Waiting on state changes with a deadline

use session_core::store::{KeyValueStore, MemoryStore, TOKEN_KEY};
use session_core::transport::{LoginSuccess, SessionTransport};
use session_core::{AuthError, AuthState, SessionController, SessionSettings};

use common::SessionToken;
use models::{Credentials, Identity};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

/// Short race window so timeout tests finish quickly.
pub const TEST_CHECK_TIMEOUT: Duration = Duration::from_millis(150);

/// Upper bound for waiting on a background state change.
pub const WAIT_DEADLINE: Duration = Duration::from_secs(3);

pub const TEST_TOKEN: &str = "test-token-12345";

/// Scripted answer to `GET /api/auth/me`.
#[derive(Debug, Clone)]
pub enum CheckReply {
    Identity(Identity),
    Rejected(u16, Option<String>),
    /// Never answers.
    Pending,
}

/// Scripted answer to `POST /api/auth/login`.
#[derive(Debug, Clone)]
pub enum LoginReply {
    Success(String, Identity),
    Rejected(u16, Option<String>),
}

#[derive(Default)]
pub struct MockTransport {
    check_replies: Mutex<VecDeque<(Duration, CheckReply)>>,
    login_replies: Mutex<VecDeque<(Duration, LoginReply)>>,
    check_calls: AtomicUsize,
    login_calls: AtomicUsize,
    seen_tokens: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_check(&self, reply: CheckReply) {
        self.push_check_after(Duration::ZERO, reply);
    }

    pub fn push_check_after(&self, delay: Duration, reply: CheckReply) {
        self.check_replies.lock().unwrap().push_back((delay, reply));
    }

    pub fn push_login(&self, reply: LoginReply) {
        self.push_login_after(Duration::ZERO, reply);
    }

    pub fn push_login_after(&self, delay: Duration, reply: LoginReply) {
        self.login_replies.lock().unwrap().push_back((delay, reply));
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionTransport for MockTransport {
    async fn check_session(&self, token: &SessionToken) -> Result<Identity, AuthError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_tokens
            .lock()
            .unwrap()
            .push(token.expose().to_string());

        let (delay, reply) = self
            .check_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((
                Duration::ZERO,
                CheckReply::Rejected(401, Some("Token is not valid".to_string())),
            ));

        tokio::time::sleep(delay).await;

        match reply {
            CheckReply::Identity(user) => Ok(user),
            CheckReply::Rejected(status, message) => Err(AuthError::rejected(status, message)),
            CheckReply::Pending => std::future::pending().await,
        }
    }

    async fn login(&self, _credentials: &Credentials) -> Result<LoginSuccess, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);

        let (delay, reply) = self
            .login_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((
                Duration::ZERO,
                LoginReply::Rejected(400, Some("Invalid credentials".to_string())),
            ));

        tokio::time::sleep(delay).await;

        match reply {
            LoginReply::Success(token, user) => Ok(LoginSuccess {
                token: SessionToken::new(token),
                user,
            }),
            LoginReply::Rejected(status, message) => Err(AuthError::rejected(status, message)),
        }
    }
}

/// Both storage scopes, shared across controller instances.
#[derive(Clone)]
pub struct Scopes {
    pub persistent: Arc<MemoryStore>,
    pub ephemeral: Arc<MemoryStore>,
}

impl Scopes {
    pub fn empty() -> Self {
        Self {
            persistent: Arc::new(MemoryStore::new()),
            ephemeral: Arc::new(MemoryStore::new()),
        }
    }

    pub fn with_token() -> Self {
        let scopes = Self::empty();
        scopes.store_token();
        scopes
    }

    pub fn store_token(&self) {
        self.persistent.set(TOKEN_KEY, TEST_TOKEN);
    }

    pub fn token(&self) -> Option<String> {
        self.persistent.get(TOKEN_KEY)
    }
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        check_timeout: TEST_CHECK_TIMEOUT,
        ..SessionSettings::default()
    }
}

/// A fresh controller over `scopes`, as on application start.
pub fn controller(transport: &Arc<MockTransport>, scopes: &Scopes) -> SessionController {
    SessionController::new(
        settings(),
        transport.clone(),
        scopes.persistent.clone(),
        scopes.ephemeral.clone(),
    )
}

pub fn user(id: &str, name: &str) -> Identity {
    Identity::new(id, name)
}

/// Wait until the published state satisfies `predicate`, or panic after
/// [`WAIT_DEADLINE`].
pub async fn wait_for_state(
    controller: &SessionController,
    predicate: impl FnMut(&AuthState) -> bool,
) -> AuthState {
    let mut rx = controller.subscribe();
    let result = tokio::time::timeout(WAIT_DEADLINE, rx.wait_for(predicate)).await;

    match result {
        Ok(Ok(state)) => state.clone(),
        Ok(Err(_)) => panic!("State channel closed"),
        Err(_) => panic!(
            "Timed out waiting for state, last seen: {:?}",
            controller.state()
        ),
    }
}
