//! Credential hashing properties.

use auth_core::HashError;
use auth_core::password::CredentialRecord;
use proptest::prelude::*;

use crate::generators::{arb_password, light_hasher};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A freshly hashed secret always verifies.
    #[test]
    fn prop_hash_round_trip(password in arb_password()) {
        let hasher = light_hasher();
        let encoded = hasher.hash_secret(password.as_bytes()).unwrap();

        prop_assert!(hasher.verify_secret(&encoded, password.as_bytes()).unwrap());
        prop_assert!(!hasher.needs_rehash(&encoded).unwrap());
    }

    /// A different secret never verifies, and mismatch is not an error.
    #[test]
    fn prop_different_secret_does_not_match(a in arb_password(), b in arb_password()) {
        prop_assume!(a != b);
        let hasher = light_hasher();
        let encoded = hasher.hash_secret(a.as_bytes()).unwrap();

        prop_assert_eq!(hasher.verify_secret(&encoded, b.as_bytes()), Ok(false));
    }

    /// Encoded records always have six `$` fields and parse back.
    #[test]
    fn prop_encoded_shape(password in arb_password()) {
        let hasher = light_hasher();
        let encoded = hasher.hash_secret(password.as_bytes()).unwrap();
        let fields: Vec<&str> = encoded.split('$').collect();

        prop_assert_eq!(fields.len(), 6);
        prop_assert!(fields[0].is_empty());
        prop_assert_eq!(fields[1], "argon2id");
        prop_assert_eq!(fields[2], "v=19");

        let record = CredentialRecord::decode(&encoded).unwrap();
        prop_assert_eq!(record.salt.len(), 16);
        prop_assert_eq!(record.digest.len(), 32);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Arbitrary input never panics and never verifies.
    #[test]
    fn prop_decode_robustness(input in ".{0,120}") {
        let hasher = light_hasher();
        match hasher.verify_secret(&input, b"password") {
            Err(HashError::Decode { .. } | HashError::IncompatibleVersion { .. }) => {}
            other => prop_assert!(false, "unexpected result {:?} for {:?}", other, input),
        }
    }

    /// Wrong field counts are decode errors.
    #[test]
    fn prop_wrong_field_count(fields in prop::collection::vec("[a-z0-9=,]{0,8}", 0..12)) {
        prop_assume!(fields.len() != 6);
        let input = fields.join("$");
        let is_decode_error = matches!(
            CredentialRecord::decode(&input),
            Err(HashError::Decode { .. })
        );
        prop_assert!(is_decode_error);
    }

    /// Unsupported versions are reported as such.
    #[test]
    fn prop_unsupported_version(version in 0u32..1000) {
        prop_assume!(version != 16 && version != 19);
        let input = format!("$argon2id$v={version}$m=64,t=1,p=1$c29tZXNhbHQ$ZGlnZXN0ZGlnZXN0");
        prop_assert_eq!(
            CredentialRecord::decode(&input),
            Err(HashError::IncompatibleVersion { found: version })
        );
    }

    /// Stored costs above the ceilings are refused before any derivation.
    #[test]
    fn prop_oversized_costs_refused(memory in 257u32.., time in 5u32..) {
        let hasher = light_hasher();
        let salt_and_digest = "c29tZXNhbHQ$ZGlnZXN0ZGlnZXN0";

        let heavy_memory = format!("$argon2id$v=19$m={memory},t=1,p=1${salt_and_digest}");
        let is_decode_error = matches!(
            hasher.verify_secret(&heavy_memory, b"password"),
            Err(HashError::Decode { .. })
        );
        prop_assert!(is_decode_error);

        let heavy_time = format!("$argon2id$v=19$m=64,t={time},p=1${salt_and_digest}");
        let is_decode_error = matches!(
            hasher.verify_secret(&heavy_time, b"password"),
            Err(HashError::Decode { .. })
        );
        prop_assert!(is_decode_error);
    }
}
