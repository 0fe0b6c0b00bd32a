//! HTTP status code helpers for classifying auth failures.

/// HTTP status code as returned by the POS API.
///
/// Stored directly rather than parsed from error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpStatusCode(pub u16);

impl HttpStatusCode {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// 4xx: the server looked at the request and refused it.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// 5xx: the server failed while handling the request.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }

    /// The token or credentials were refused outright.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.0, 400 | 401 | 403 | 404)
    }

    /// 431 Request Header Fields Too Large. An oversized stored token causes this.
    pub fn is_header_too_large(&self) -> bool {
        self.0 == 431
    }
}

impl From<u16> for HttpStatusCode {
    fn from(code: u16) -> Self {
        HttpStatusCode(code)
    }
}

impl std::fmt::Display for HttpStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
