//! Tracing subscriber setup.
//!
//! Services call [`init_tracing`] once at startup. `RUST_LOG` takes
//! precedence over the configured level.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing_subscriber::util::TryInitError;

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Log level filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Whether to output JSON format
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "rust-service".to_string(),
            log_level: "info".to_string(),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Create config with custom service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Create config with custom log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set JSON output on or off.
    #[must_use]
    pub const fn with_json_output(mut self, enabled: bool) -> Self {
        self.json_output = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(config.filter());

    if config.json_output {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::debug!(service = %config.service_name, "tracing initialized");
    Ok(())
}
