//! Shared primitives for the POS session client.
//!
//! ## Architecture
//!
//! - **common** (this crate): Error location tracking, HTTP status helpers, token wrapper
//! - **models**: Pure data exchanged with the POS API
//! - **session-core**: Token/breaker storage, transport, state machine, controller
//! - **pos-session**: Command-line application wiring everything together

pub mod error;
pub mod http_status;
pub mod session_token;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use http_status::HttpStatusCode;
pub use session_token::SessionToken;
