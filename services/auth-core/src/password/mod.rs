//! Memory-hard credential hashing.

pub mod hasher;
pub mod pool;
pub mod record;

pub use hasher::{CredentialHasher, HasherConfig};
pub use pool::HashingPool;
pub use record::CredentialRecord;

use thiserror::Error;

/// Hashing and verification errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// The OS entropy source failed
    #[error("entropy source failure: {reason}")]
    Entropy {
        /// Underlying message
        reason: String,
    },

    /// The stored record could not be parsed
    #[error("invalid credential record: {reason}")]
    Decode {
        /// What was wrong
        reason: String,
    },

    /// The stored record uses an Argon2 version this build cannot verify
    #[error("incompatible argon2 version {found}")]
    IncompatibleVersion {
        /// Version number found in the record
        found: u32,
    },

    /// The hasher configuration is unusable
    #[error("invalid hasher parameters: {reason}")]
    InvalidParameters {
        /// What was wrong
        reason: String,
    },

    /// The key derivation itself failed
    #[error("key derivation failed: {reason}")]
    Kdf {
        /// Underlying message
        reason: String,
    },

    /// The hashing pool is closed or a worker died
    #[error("hashing unavailable: {reason}")]
    Unavailable {
        /// Underlying message
        reason: String,
    },
}

impl HashError {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }
}
