//! Data exchanged between the POS client and the auth API.
//!
//! Models carry no behavior beyond shape checks; the session logic lives in
//! `session-core`.

pub mod credentials;
pub mod error;
pub mod identity;


pub use credentials::Credentials;
pub use error::model_error::ModelError;
pub use identity::{Identity, LoginResponse, ServerMessage};
