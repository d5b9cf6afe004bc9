//! Per-token-type signing secrets and validity windows.
//!
//! The store is built once at startup and shared read-only through an `Arc`.
//! Construction is the only place secrets are checked: a missing or short
//! secret is a boot failure, never a per-request error.

use std::collections::HashMap;
use std::fmt;

use chrono::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::AuthConfig;
use crate::jwt::TokenType;

/// Minimum secret length used when the configuration does not override it.
pub const DEFAULT_MIN_SECRET_LENGTH: usize = 12;

/// Key store construction and lookup errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreError {
    /// No secret was configured for a required token type
    #[error("missing signing secret for {token_type}")]
    MissingSecret {
        /// Token type without a secret
        token_type: TokenType,
    },

    /// Secret shorter than the configured minimum
    #[error("signing secret for {token_type} is {actual} bytes, minimum is {minimum}")]
    SecretTooShort {
        /// Offending token type
        token_type: TokenType,
        /// Configured minimum length
        minimum: usize,
        /// Actual length
        actual: usize,
    },

    /// Validity window is zero, negative or out of range
    #[error("invalid validity window for {token_type}")]
    InvalidValidity {
        /// Offending token type
        token_type: TokenType,
    },

    /// Lookup for a type this store was not built with
    #[error("no key configured for {token_type}")]
    UnknownTokenType {
        /// Requested token type
        token_type: TokenType,
    },
}

/// Signing secret and validity window for one token type.
pub struct TokenKey {
    secret: Zeroizing<Vec<u8>>,
    validity: Duration,
}

impl TokenKey {
    /// Raw HMAC secret.
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Fixed validity window measured from `iat`.
    #[must_use]
    pub const fn validity(&self) -> Duration {
        self.validity
    }
}

impl fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKey")
            .field("secret", &"[REDACTED]")
            .field("validity", &self.validity)
            .finish()
    }
}

/// Immutable lookup table keyed by [`TokenType`].
#[derive(Debug)]
pub struct SecretKeyStore {
    keys: HashMap<TokenType, TokenKey>,
}

impl SecretKeyStore {
    /// Starts a builder enforcing `min_secret_length`.
    #[must_use]
    pub fn builder(min_secret_length: usize) -> SecretKeyStoreBuilder {
        SecretKeyStoreBuilder {
            min_secret_length,
            entries: Vec::new(),
        }
    }

    /// Builds the complete store from boot configuration.
    ///
    /// # Errors
    ///
    /// Fails if any token type lacks a secret, a secret is shorter than the
    /// configured minimum, or a validity window is unusable.
    pub fn from_config(config: &AuthConfig) -> Result<Self, KeyStoreError> {
        let mut builder = Self::builder(config.min_secret_length);
        for token_type in TokenType::ALL {
            let settings = config.token(token_type);
            let secret = settings
                .secret
                .as_ref()
                .ok_or(KeyStoreError::MissingSecret { token_type })?;
            builder = builder.with_key(token_type, secret.as_bytes(), settings.validity);
        }
        builder.build_complete()
    }

    /// Resolves the key for `token_type`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::UnknownTokenType`] if the store was built
    /// without that type.
    pub fn resolve(&self, token_type: TokenType) -> Result<&TokenKey, KeyStoreError> {
        self.keys
            .get(&token_type)
            .ok_or(KeyStoreError::UnknownTokenType { token_type })
    }

    /// Validity window for `token_type`.
    ///
    /// # Errors
    ///
    /// Same as [`SecretKeyStore::resolve`].
    pub fn validity(&self, token_type: TokenType) -> Result<Duration, KeyStoreError> {
        self.resolve(token_type).map(TokenKey::validity)
    }

    /// Whether the store carries a key for `token_type`.
    #[must_use]
    pub fn supports(&self, token_type: TokenType) -> bool {
        self.keys.contains_key(&token_type)
    }
}

/// Builder for [`SecretKeyStore`]; validation happens in `build`.
pub struct SecretKeyStoreBuilder {
    min_secret_length: usize,
    entries: Vec<(TokenType, Zeroizing<Vec<u8>>, std::time::Duration)>,
}

impl SecretKeyStoreBuilder {
    /// Adds (or replaces) the key for `token_type`.
    #[must_use]
    pub fn with_key(
        mut self,
        token_type: TokenType,
        secret: impl AsRef<[u8]>,
        validity: std::time::Duration,
    ) -> Self {
        self.entries.retain(|(t, _, _)| *t != token_type);
        self.entries
            .push((token_type, Zeroizing::new(secret.as_ref().to_vec()), validity));
        self
    }

    /// Builds a store with whatever types were added.
    ///
    /// # Errors
    ///
    /// Fails on a short secret or an unusable validity window.
    pub fn build(self) -> Result<SecretKeyStore, KeyStoreError> {
        let mut keys = HashMap::with_capacity(self.entries.len());

        for (token_type, secret, validity) in self.entries {
            if secret.len() < self.min_secret_length {
                return Err(KeyStoreError::SecretTooShort {
                    token_type,
                    minimum: self.min_secret_length,
                    actual: secret.len(),
                });
            }

            let validity = Duration::from_std(validity)
                .ok()
                .filter(|v| *v > Duration::zero())
                .ok_or(KeyStoreError::InvalidValidity { token_type })?;

            keys.insert(token_type, TokenKey { secret, validity });
        }

        Ok(SecretKeyStore { keys })
    }

    /// Builds a store that must cover every [`TokenType`].
    ///
    /// # Errors
    ///
    /// As [`SecretKeyStoreBuilder::build`], plus
    /// [`KeyStoreError::MissingSecret`] for any absent type.
    pub fn build_complete(self) -> Result<SecretKeyStore, KeyStoreError> {
        let store = self.build()?;
        for token_type in TokenType::ALL {
            if !store.supports(token_type) {
                return Err(KeyStoreError::MissingSecret { token_type });
            }
        }
        Ok(store)
    }
}
