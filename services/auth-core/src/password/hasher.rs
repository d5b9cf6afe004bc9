//! Argon2 hashing and constant-time verification.

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::record::{CredentialRecord, MAX_DIGEST_LEN, MAX_SALT_LEN, MIN_DIGEST_LEN, MIN_SALT_LEN};
use super::HashError;

/// Stored records may cost at most this multiple of the active profile.
pub const CEILING_FACTOR: u32 = 4;

/// Argon2 profile used for new hashes, plus the ceilings a stored record
/// must stay under before it is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherConfig {
    /// Argon2 variant
    pub algorithm: Algorithm,
    /// Argon2 version
    pub version: Version,
    /// Memory cost in KiB
    pub memory_cost_kib: u32,
    /// Number of passes
    pub time_cost: u32,
    /// Degree of parallelism
    pub parallelism: u32,
    /// Salt length in bytes
    pub salt_length: usize,
    /// Digest length in bytes
    pub digest_length: usize,
    /// Largest memory cost accepted from a stored record
    pub max_memory_cost_kib: u32,
    /// Largest time cost accepted from a stored record
    pub max_time_cost: u32,
    /// Largest parallelism accepted from a stored record
    pub max_parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Argon2id,
            version: Version::V0x13,
            memory_cost_kib: 64 * 1024,
            time_cost: 3,
            parallelism: 2,
            salt_length: 16,
            digest_length: 32,
            max_memory_cost_kib: 64 * 1024 * CEILING_FACTOR,
            max_time_cost: 3 * CEILING_FACTOR,
            max_parallelism: 2 * CEILING_FACTOR,
        }
    }
}

impl HasherConfig {
    /// Resets the ceilings to [`CEILING_FACTOR`] times the current profile.
    #[must_use]
    pub const fn with_default_ceilings(mut self) -> Self {
        self.max_memory_cost_kib = self.memory_cost_kib.saturating_mul(CEILING_FACTOR);
        self.max_time_cost = self.time_cost.saturating_mul(CEILING_FACTOR);
        self.max_parallelism = self.parallelism.saturating_mul(CEILING_FACTOR);
        self
    }

    /// Checks the profile against Argon2's limits and its own ceilings.
    ///
    /// # Errors
    ///
    /// [`HashError::InvalidParameters`] describing the first violation.
    pub fn validate(&self) -> Result<(), HashError> {
        if self.time_cost < 1 {
            return Err(HashError::invalid("time cost must be at least 1"));
        }
        if self.parallelism < 1 {
            return Err(HashError::invalid("parallelism must be at least 1"));
        }
        if self.memory_cost_kib < self.parallelism.saturating_mul(8) {
            return Err(HashError::invalid(
                "memory cost must be at least 8 KiB per lane",
            ));
        }
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&self.salt_length) {
            return Err(HashError::invalid(format!(
                "salt length must be between {MIN_SALT_LEN} and {MAX_SALT_LEN} bytes"
            )));
        }
        if !(MIN_DIGEST_LEN..=MAX_DIGEST_LEN).contains(&self.digest_length) {
            return Err(HashError::invalid(format!(
                "digest length must be between {MIN_DIGEST_LEN} and {MAX_DIGEST_LEN} bytes"
            )));
        }
        if self.memory_cost_kib > self.max_memory_cost_kib
            || self.time_cost > self.max_time_cost
            || self.parallelism > self.max_parallelism
        {
            return Err(HashError::invalid("profile exceeds its own ceilings"));
        }

        self.params().map(|_| ())
    }

    fn params(&self) -> Result<Params, HashError> {
        Params::new(
            self.memory_cost_kib,
            self.time_cost,
            self.parallelism,
            Some(self.digest_length),
        )
        .map_err(|e| HashError::invalid(e.to_string()))
    }

    fn admits(&self, record: &CredentialRecord) -> Result<(), HashError> {
        let limits = [
            ("m", record.memory_cost_kib, self.max_memory_cost_kib),
            ("t", record.time_cost, self.max_time_cost),
            ("p", record.parallelism, self.max_parallelism),
        ];
        for (name, found, max) in limits {
            if found > max {
                return Err(HashError::decode(format!(
                    "{name}={found} exceeds the ceiling of {max}"
                )));
            }
        }
        Ok(())
    }

    fn matches(&self, record: &CredentialRecord) -> bool {
        record.algorithm == self.algorithm
            && record.version == self.version
            && record.memory_cost_kib == self.memory_cost_kib
            && record.time_cost == self.time_cost
            && record.parallelism == self.parallelism
            && record.salt.len() == self.salt_length
            && record.digest.len() == self.digest_length
    }
}

/// Hashes new secrets with one profile and verifies records of any profile
/// within the configured ceilings.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    config: HasherConfig,
}

impl CredentialHasher {
    /// Creates a hasher after validating `config`.
    ///
    /// # Errors
    ///
    /// [`HashError::InvalidParameters`] if the profile is unusable.
    pub fn new(config: HasherConfig) -> Result<Self, HashError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active profile.
    #[must_use]
    pub const fn config(&self) -> &HasherConfig {
        &self.config
    }

    /// Hashes `plaintext` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// [`HashError::Entropy`] if the OS RNG fails, [`HashError::Kdf`] if
    /// derivation fails.
    pub fn hash_secret(&self, plaintext: &[u8]) -> Result<String, HashError> {
        let mut salt = vec![0u8; self.config.salt_length];
        OsRng.try_fill_bytes(&mut salt).map_err(|e| {
            tracing::error!(error = %e, "OS entropy source failed");
            HashError::Entropy {
                reason: e.to_string(),
            }
        })?;
        let salt = SaltString::encode_b64(&salt).map_err(|e| HashError::invalid(e.to_string()))?;

        let argon2 = Argon2::new(self.config.algorithm, self.config.version, self.config.params()?);
        let hash = argon2
            .hash_password(plaintext, &salt)
            .map_err(|e| HashError::Kdf {
                reason: e.to_string(),
            })?;

        Ok(hash.to_string())
    }

    /// Verifies `plaintext` against a stored record.
    ///
    /// The record's embedded parameters are used, not the active profile,
    /// as long as they stay under the configured ceilings. A mismatch is
    /// `Ok(false)`.
    ///
    /// # Errors
    ///
    /// [`HashError::Decode`] or [`HashError::IncompatibleVersion`] when the
    /// record cannot be parsed or its parameters are out of range.
    pub fn verify_secret(&self, encoded: &str, plaintext: &[u8]) -> Result<bool, HashError> {
        let record = CredentialRecord::decode(encoded)?;
        self.config.admits(&record)?;

        let params = Params::new(
            record.memory_cost_kib,
            record.time_cost,
            record.parallelism,
            Some(record.digest.len()),
        )
        .map_err(|e| HashError::decode(format!("parameters out of range: {e}")))?;

        let candidate = derive(
            record.algorithm,
            record.version,
            params,
            plaintext,
            &record.salt,
            record.digest.len(),
        )
        .map_err(|e| HashError::decode(format!("record rejected by kdf: {e}")))?;

        Ok(candidate.as_slice().ct_eq(record.digest.as_slice()).into())
    }

    /// Whether a stored record was produced with a different profile.
    ///
    /// # Errors
    ///
    /// Same decode errors as [`CredentialHasher::verify_secret`].
    pub fn needs_rehash(&self, encoded: &str) -> Result<bool, HashError> {
        let record = CredentialRecord::decode(encoded)?;
        Ok(!self.config.matches(&record))
    }
}

fn derive(
    algorithm: Algorithm,
    version: Version,
    params: Params,
    plaintext: &[u8],
    salt: &[u8],
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, argon2::Error> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    Argon2::new(algorithm, version, params).hash_password_into(plaintext, salt, out.as_mut_slice())?;
    Ok(out)
}
