//! Tower middleware.

pub mod auth;

pub use auth::{AuthGateLayer, AuthGateService, CORRELATION_ID_HEADER};
