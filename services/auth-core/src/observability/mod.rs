//! Structured logging for gate decisions.

pub mod logging;

pub use logging::{log_allowed, log_rejection};
