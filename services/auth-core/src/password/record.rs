//! Self-describing credential hash string.
//!
//! `$<algorithm>$v=<version>$m=<KiB>,t=<passes>,p=<lanes>$<salt>$<digest>`
//! with standard base64, no padding.

use std::fmt;

use argon2::password_hash::{Output, ParamsString, PasswordHash, Salt, SaltString};
use argon2::{Algorithm, Params, Version};
use zeroize::Zeroizing;

use super::HashError;

/// Number of `$`-separated fields, counting the empty one before the first `$`.
pub const FIELD_COUNT: usize = 6;
/// Smallest salt accepted when decoding a stored record.
pub const MIN_SALT_LEN: usize = 8;
/// Largest salt that fits the 64-character salt field.
pub const MAX_SALT_LEN: usize = Salt::MAX_LENGTH * 3 / 4;
/// Smallest digest the record format carries.
pub const MIN_DIGEST_LEN: usize = Output::MIN_LENGTH;
/// Largest digest the record format carries.
pub const MAX_DIGEST_LEN: usize = Output::MAX_LENGTH;

/// Parsed credential hash.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
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
    /// Random salt
    pub salt: Vec<u8>,
    /// Derived key
    pub digest: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("algorithm", &self.algorithm.as_str())
            .field("version", &u32::from(self.version))
            .field("memory_cost_kib", &self.memory_cost_kib)
            .field("time_cost", &self.time_cost)
            .field("parallelism", &self.parallelism)
            .field("salt_len", &self.salt.len())
            .field("digest_len", &self.digest.len())
            .finish()
    }
}

impl CredentialRecord {
    /// Serializes the record into its persisted form.
    ///
    /// # Errors
    ///
    /// [`HashError::InvalidParameters`] if a field does not fit the format.
    pub fn encode(&self) -> Result<String, HashError> {
        let salt = SaltString::encode_b64(&self.salt)
            .map_err(|e| HashError::invalid(format!("salt: {e}")))?;
        let params = Params::new(
            self.memory_cost_kib,
            self.time_cost,
            self.parallelism,
            Some(self.digest.len()),
        )
        .map_err(|e| HashError::invalid(e.to_string()))?;

        let hash = PasswordHash {
            algorithm: self.algorithm.ident(),
            version: Some(self.version.into()),
            params: ParamsString::try_from(&params)
                .map_err(|e| HashError::invalid(e.to_string()))?,
            salt: Some(salt.as_salt()),
            hash: Some(
                Output::new(self.digest.as_slice())
                    .map_err(|e| HashError::invalid(format!("digest: {e}")))?,
            ),
        };

        Ok(hash.to_string())
    }

    /// Parses a persisted record.
    ///
    /// # Errors
    ///
    /// [`HashError::Decode`] on a wrong field count, unknown algorithm,
    /// malformed parameter block or bad base64;
    /// [`HashError::IncompatibleVersion`] on an unsupported version.
    pub fn decode(encoded: &str) -> Result<Self, HashError> {
        let fields = encoded.split('$').count();
        if fields != FIELD_COUNT {
            return Err(HashError::decode(format!(
                "expected {FIELD_COUNT} fields, found {fields}"
            )));
        }
        if !encoded.starts_with('$') {
            return Err(HashError::decode("record must start with '$'"));
        }

        let hash = PasswordHash::new(encoded).map_err(|e| HashError::decode(e.to_string()))?;

        let algorithm: Algorithm = hash.algorithm.as_str().parse().map_err(|_| {
            HashError::decode(format!("unrecognised algorithm {:?}", hash.algorithm.as_str()))
        })?;

        let found = hash
            .version
            .ok_or_else(|| HashError::decode("missing version field"))?;
        let version = Version::try_from(found).map_err(|_| HashError::IncompatibleVersion { found })?;

        if hash.params.iter().count() != 3 {
            return Err(HashError::decode("expected m=,t=,p= parameters"));
        }
        let memory_cost_kib = decimal(&hash.params, "m")?;
        let time_cost = decimal(&hash.params, "t")?;
        let parallelism = decimal(&hash.params, "p")?;

        let mut buf = [0u8; Salt::MAX_LENGTH];
        let salt = hash
            .salt
            .ok_or_else(|| HashError::decode("missing salt"))?
            .decode_b64(&mut buf)
            .map_err(|e| HashError::decode(format!("salt: {e}")))?
            .to_vec();
        let digest = Zeroizing::new(
            hash.hash
                .ok_or_else(|| HashError::decode("missing digest"))?
                .as_bytes()
                .to_vec(),
        );

        if salt.len() < MIN_SALT_LEN {
            return Err(HashError::decode("salt too short"));
        }

        Ok(Self {
            algorithm,
            version,
            memory_cost_kib,
            time_cost,
            parallelism,
            salt,
            digest,
        })
    }
}

fn decimal(params: &ParamsString, name: &str) -> Result<u32, HashError> {
    params
        .get_decimal(name)
        .ok_or_else(|| HashError::decode(format!("{name}= is missing or not a number")))
}
