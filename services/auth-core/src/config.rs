//! Boot configuration from environment variables.
//!
//! Loaded once at startup. Token durations fall back to their defaults with
//! a warning when malformed; everything else fails loudly.

use std::fmt;
use std::time::Duration;

use rust_common::env::{self, EnvError, ProcessEnv, VarSource};
use rust_common::TracingConfig;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::jwt::TokenType;
use crate::keys::DEFAULT_MIN_SECRET_LENGTH;
use crate::password::{HashError, HasherConfig};

const SERVICE_NAME: &str = "auth-core";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable was set but malformed
    #[error(transparent)]
    Env(#[from] EnvError),

    /// A value parsed but is out of range
    #[error("Invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// What was wrong
        reason: String,
    },

    /// The Argon2 profile is unusable
    #[error("Invalid hasher profile: {0}")]
    Hasher(#[source] HashError),
}

/// Secret and validity for one token type.
#[derive(Clone)]
pub struct TokenSettings {
    /// Signing secret, if configured
    pub secret: Option<Zeroizing<String>>,
    /// Validity window
    pub validity: Duration,
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("validity", &self.validity)
            .finish()
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access token settings
    pub access: TokenSettings,
    /// Refresh token settings
    pub refresh: TokenSettings,
    /// Settings-access token settings
    pub settings_access: TokenSettings,
    /// Minimum signing secret length in bytes
    pub min_secret_length: usize,
    /// Argon2 profile for new hashes
    pub hasher: HasherConfig,
    /// Concurrent hash operations
    pub hash_max_concurrency: usize,
    /// Bound on the subject directory call
    pub subject_lookup_timeout: Duration,
    /// Log filter directive
    pub log_level: String,
    /// JSON log output
    pub log_json: bool,
}

impl AuthConfig {
    /// Loads configuration from the process environment and `.env`.
    ///
    /// # Errors
    ///
    /// See [`AuthConfig::from_source`].
    pub fn from_env() -> Result<Self, ConfigError> {
        env::load_dotenv();
        Self::from_source(&ProcessEnv)
    }

    /// Loads configuration from `source`.
    ///
    /// Missing secrets are not an error here; the key store rejects them.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] for malformed or out-of-range values.
    pub fn from_source(source: &dyn VarSource) -> Result<Self, ConfigError> {
        let defaults = HasherConfig::default();
        let profile = HasherConfig {
            time_cost: env::parse_or(source, "ARGON2_TIME_COST", defaults.time_cost)?,
            memory_cost_kib: env::parse_or(source, "ARGON2_MEMORY_KIB", defaults.memory_cost_kib)?,
            parallelism: env::parse_or(source, "ARGON2_PARALLELISM", defaults.parallelism)?,
            salt_length: env::parse_or(source, "ARGON2_SALT_LENGTH", defaults.salt_length)?,
            digest_length: env::parse_or(source, "ARGON2_DIGEST_LENGTH", defaults.digest_length)?,
            ..defaults
        }
        .with_default_ceilings();
        let hasher = HasherConfig {
            max_memory_cost_kib: env::parse_or(
                source,
                "ARGON2_MAX_MEMORY_KIB",
                profile.max_memory_cost_kib,
            )?,
            max_time_cost: env::parse_or(source, "ARGON2_MAX_TIME_COST", profile.max_time_cost)?,
            max_parallelism: env::parse_or(source, "ARGON2_MAX_PARALLELISM", profile.max_parallelism)?,
            ..profile
        };

        let config = Self {
            access: TokenSettings {
                secret: secret(source, "ACCESS_TOKEN_SECRET"),
                validity: minutes(env::parse_or_warn(source, "ACCESS_TOKEN_DURATION_MINUTES", 15)),
            },
            refresh: TokenSettings {
                secret: secret(source, "REFRESH_TOKEN_SECRET"),
                validity: days(env::parse_or_warn(source, "REFRESH_TOKEN_DURATION_DAYS", 7)),
            },
            settings_access: TokenSettings {
                secret: secret(source, "SETTINGS_ACCESS_TOKEN_SECRET"),
                validity: minutes(env::parse_or_warn(
                    source,
                    "SETTINGS_ACCESS_TOKEN_DURATION_MINUTES",
                    5,
                )),
            },
            min_secret_length: env::parse_or(source, "SECRET_MIN_LENGTH", DEFAULT_MIN_SECRET_LENGTH)?,
            hasher,
            hash_max_concurrency: env::parse_or(source, "HASH_MAX_CONCURRENCY", 4)?,
            subject_lookup_timeout: Duration::from_millis(env::parse_or(
                source,
                "SUBJECT_LOOKUP_TIMEOUT_MS",
                2000,
            )?),
            log_level: env::read_string(source, "LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: env::parse_or(source, "LOG_JSON", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.hash_max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "HASH_MAX_CONCURRENCY",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.subject_lookup_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "SUBJECT_LOOKUP_TIMEOUT_MS",
                reason: "must be greater than 0".to_string(),
            });
        }
        self.hasher.validate().map_err(ConfigError::Hasher)
    }

    /// Settings for `token_type`.
    #[must_use]
    pub const fn token(&self, token_type: TokenType) -> &TokenSettings {
        match token_type {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
            TokenType::SettingsAccess => &self.settings_access,
        }
    }

    /// Tracing setup derived from the log settings.
    #[must_use]
    pub fn tracing(&self) -> TracingConfig {
        TracingConfig::default()
            .with_service_name(SERVICE_NAME)
            .with_log_level(&self.log_level)
            .with_json_output(self.log_json)
    }
}

fn secret(source: &dyn VarSource, name: &str) -> Option<Zeroizing<String>> {
    source
        .var(name)
        .filter(|v| !v.is_empty())
        .map(Zeroizing::new)
}

const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60))
}

const fn days(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(86_400))
}
