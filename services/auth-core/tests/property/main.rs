//! Property-Based Tests
//!
//! Uses proptest for invariant verification.
//!
//! Test categories:
//! - credentials: hash round-trip, non-match, decode robustness
//! - tokens: issue/verify round-trip, expiry boundary, type confusion, tampering

mod credentials;
mod generators;
mod tokens;
