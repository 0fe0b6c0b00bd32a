use super::{AUTH_TOKEN_HEADER, LoginSuccess, SessionTransport};
use crate::error::AuthError;

use common::SessionToken;
use models::{Credentials, Identity, LoginResponse, ServerMessage};

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Response};
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const API_AUTH_PREFIX: &str = "api/auth/";
const SESSION_ENDPOINT: &str = const_format::concatcp!(API_AUTH_PREFIX, "me");
const LOGIN_ENDPOINT: &str = const_format::concatcp!(API_AUTH_PREFIX, "login");

/// [`SessionTransport`] over the POS REST API.
#[derive(Clone)]
pub struct HttpSessionTransport {
    base_url: Url,
    client: Client,
}

impl HttpSessionTransport {
    pub fn new(base_url_str: &str) -> Result<Self, AuthError> {
        Self::with_request_timeout(base_url_str, DEFAULT_REQUEST_TIMEOUT)
    }

    /// `request_timeout` caps each HTTP request. It is a transport-level guard and is
    /// separate from the controller's session-check timeout.
    pub fn with_request_timeout(
        base_url_str: &str,
        request_timeout: Duration,
    ) -> Result<Self, AuthError> {
        // Without a trailing slash, Url::join would replace the last path segment.
        let base_url = if base_url_str.ends_with('/') {
            Url::parse(base_url_str)?
        } else {
            Url::parse(&format!("{base_url_str}/"))?
        };

        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl SessionTransport for HttpSessionTransport {
    async fn check_session(&self, token: &SessionToken) -> Result<Identity, AuthError> {
        let url = self.base_url.join(SESSION_ENDPOINT)?;
        debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .header(AUTH_TOKEN_HEADER, token.expose())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let identity: Identity = response.json().await?;
        Ok(identity)
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginSuccess, AuthError> {
        let url = self.base_url.join(LOGIN_ENDPOINT)?;
        debug!("POST {url} for {}", credentials.email);

        let response = self.client.post(url).json(credentials).send().await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: LoginResponse = response.json().await?;
        let Some(token) = body.token.filter(|token| !token.is_empty()) else {
            warn!("Login response for {} carried no token", credentials.email);
            return Err(AuthError::missing_token());
        };

        Ok(LoginSuccess {
            token,
            user: body.user,
        })
    }
}

/// Turn a non-2xx response into [`AuthError::Rejected`], keeping `{message}` if present.
async fn rejection(response: Response) -> AuthError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ServerMessage>(&body)
        .ok()
        .and_then(|parsed| parsed.message);

    if message.is_none() && !body.is_empty() {
        debug!("HTTP {status} body had no message field: {body}");
    }

    AuthError::rejected(status, message)
}
