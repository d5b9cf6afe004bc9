//! Bounded-concurrency front for [`CredentialHasher`].
//!
//! Argon2 with the default profile holds 64 MiB per call. The pool caps how
//! many derivations run at once and keeps them off the async workers.

use std::sync::Arc;

use tokio::sync::Semaphore;
use zeroize::Zeroizing;

use super::{CredentialHasher, HashError};

/// Shared hashing front; clones share the same permit budget.
#[derive(Debug, Clone)]
pub struct HashingPool {
    hasher: Arc<CredentialHasher>,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
}

impl HashingPool {
    /// Creates a pool allowing `max_concurrency` simultaneous derivations.
    ///
    /// # Errors
    ///
    /// [`HashError::InvalidParameters`] if `max_concurrency` is zero.
    pub fn new(hasher: CredentialHasher, max_concurrency: usize) -> Result<Self, HashError> {
        if max_concurrency == 0 {
            return Err(HashError::invalid("hash concurrency must be greater than 0"));
        }

        Ok(Self {
            hasher: Arc::new(hasher),
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        })
    }

    /// Underlying hasher.
    #[must_use]
    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    /// Configured bound.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Permits not currently held.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Hashes `plaintext` on the blocking pool.
    ///
    /// # Errors
    ///
    /// As [`CredentialHasher::hash_secret`], plus [`HashError::Unavailable`].
    pub async fn hash(&self, plaintext: &[u8]) -> Result<String, HashError> {
        let plaintext = Zeroizing::new(plaintext.to_vec());
        self.run(move |hasher| hasher.hash_secret(&plaintext)).await
    }

    /// Verifies `plaintext` against `encoded` on the blocking pool.
    ///
    /// # Errors
    ///
    /// As [`CredentialHasher::verify_secret`], plus [`HashError::Unavailable`].
    pub async fn verify(&self, encoded: &str, plaintext: &[u8]) -> Result<bool, HashError> {
        let encoded = encoded.to_string();
        let plaintext = Zeroizing::new(plaintext.to_vec());
        self.run(move |hasher| hasher.verify_secret(&encoded, &plaintext))
            .await
    }

    async fn run<T, F>(&self, work: F) -> Result<T, HashError>
    where
        T: Send + 'static,
        F: FnOnce(&CredentialHasher) -> Result<T, HashError> + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| HashError::Unavailable {
                reason: e.to_string(),
            })?;

        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work(&hasher)
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "hashing task failed");
            HashError::Unavailable {
                reason: e.to_string(),
            }
        })?
    }
}
