//! Network side of the session: the identity check and the login exchange.
//!
//! The transport reports what the server said and nothing more. In particular it does
//! not race the identity check against the session timeout; the controller does that
//! so a timeout stays distinguishable from a rejection.

pub mod http;

pub use http::HttpSessionTransport;

use crate::error::AuthError;

use common::SessionToken;
use models::{Credentials, Identity};

use async_trait::async_trait;

/// Header carrying the bearer token on authenticated requests.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Token and user returned by a successful login.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub token: SessionToken,
    pub user: Identity,
}

#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Ask the server who owns `token`.
    ///
    /// # Errors
    /// [`AuthError`] if the server refuses the token or cannot be reached.
    async fn check_session(&self, token: &SessionToken) -> Result<Identity, AuthError>;

    /// Exchange credentials for a token.
    ///
    /// # Errors
    /// [`AuthError`] carrying the server's message when it has one.
    async fn login(&self, credentials: &Credentials) -> Result<LoginSuccess, AuthError>;
}
