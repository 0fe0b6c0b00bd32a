mod auth_error;
mod breaker;
mod config;
mod in_flight;
mod machine;
