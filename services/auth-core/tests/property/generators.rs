//! Shared generators and fixtures for property-based tests.

use std::sync::Arc;
use std::time::Duration;

use auth_core::{CredentialHasher, HasherConfig, SecretKeyStore, TokenType};
use proptest::prelude::*;

pub const ACCESS_SECRET: &str = "access-secret-0123456789";
pub const REFRESH_SECRET: &str = "refresh-secret-0123456789";
pub const SETTINGS_SECRET: &str = "settings-secret-0123456789";

/// Store with all three types and production default windows.
pub fn key_store() -> Arc<SecretKeyStore> {
    Arc::new(
        SecretKeyStore::builder(12)
            .with_key(TokenType::Access, ACCESS_SECRET, Duration::from_secs(15 * 60))
            .with_key(TokenType::Refresh, REFRESH_SECRET, Duration::from_secs(7 * 86_400))
            .with_key(TokenType::SettingsAccess, SETTINGS_SECRET, Duration::from_secs(5 * 60))
            .build_complete()
            .unwrap(),
    )
}

/// Argon2 profile cheap enough for many iterations.
pub fn light_hasher() -> CredentialHasher {
    CredentialHasher::new(
        HasherConfig {
            memory_cost_kib: 64,
            time_cost: 1,
            parallelism: 1,
            ..HasherConfig::default()
        }
        .with_default_ceilings(),
    )
    .unwrap()
}

pub fn arb_token_type() -> impl Strategy<Value = TokenType> {
    prop_oneof![
        Just(TokenType::Access),
        Just(TokenType::Refresh),
        Just(TokenType::SettingsAccess),
    ]
}

/// Non-empty subjects, mostly email-shaped.
pub fn arb_subject() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9.]{0,15}@[a-z]{2,10}\\.[a-z]{2,4}",
        "[a-zA-Z0-9_-]{1,32}",
    ]
}

pub fn arb_password() -> impl Strategy<Value = String> {
    ".{0,40}"
}

/// Issue instants within a few years of 2024.
pub fn arb_issued_at() -> impl Strategy<Value = i64> {
    1_700_000_000i64..1_800_000_000i64
}
