//! Client-side storage for the bearer token and the circuit breaker.
//!
//! Two scopes back the session:
//! - a **persistent** scope that outlives the process (the bearer token)
//! - an **ephemeral** scope that lives for one client session (attempt counter,
//!   breaker flag)
//!
//! Both scopes are plain string key/value stores behind [`KeyValueStore`]. The typed
//! wrappers [`TokenStore`] and [`BreakerStore`] are the only code that knows the keys.

pub mod breaker;
pub mod file;
pub mod memory;
pub mod token;

pub use breaker::{BreakerStore, DEFAULT_TRIP_THRESHOLD};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use token::TokenStore;

/// Persistent key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Ephemeral key holding the stringified failed-attempt count.
pub const ATTEMPTS_KEY: &str = "auth_attempts";

/// Ephemeral key holding `"true"` while the breaker is tripped.
pub const CIRCUIT_BROKEN_KEY: &str = "auth_circuit_broken";

/// A string key/value storage scope.
///
/// Operations are synchronous and infallible from the caller's point of view.
/// Backends that can fail underneath (files) log the failure and keep serving the
/// in-memory value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);

    /// Drop every key in this scope.
    fn clear(&self);
}
