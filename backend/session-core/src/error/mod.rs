pub mod auth;
pub mod config;
pub mod store;

pub use auth::AuthError;
pub use config::ConfigError;
pub use store::StoreError;
