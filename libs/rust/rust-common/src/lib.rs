//! Shared library for cross-cutting concerns in auth-platform Rust services.
//!
//! This crate provides centralized implementations for:
//! - Environment-variable configuration parsing with defaults
//! - Tracing subscriber initialization (plain or JSON output)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod tracing_config;

pub use env::{EnvError, ProcessEnv, VarSource};
pub use tracing_config::{TracingConfig, init_tracing};
