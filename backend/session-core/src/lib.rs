pub mod config;
pub mod controller;
pub mod error;
pub mod guard;
pub mod machine;
pub mod store;
pub mod transport;

#[cfg(test)]
mod tests;

pub use controller::{SessionController, SessionSettings};
pub use error::{AuthError, ConfigError, StoreError};
pub use machine::{AuthEvent, AuthPhase, AuthState, transition};

pub const POS_API_DEFAULT_HOSTNAME: &str = "localhost";
pub const POS_API_DEFAULT_BASE_URL: &str =
    const_format::concatcp!("http://", POS_API_DEFAULT_HOSTNAME, ":3000");
