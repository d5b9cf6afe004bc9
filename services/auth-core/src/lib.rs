//! Auth Core - credential hashing, typed token issuance and request gating.
//!
//! This crate provides the authentication core shared by the platform's
//! HTTP services: Argon2 credential records, HMAC-signed access/refresh/
//! settings tokens validated through a type-state pipeline, and a Tower
//! layer that turns an `Authorization` header into a verified identity.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod gate;
pub mod jwt;
pub mod keys;
pub mod middleware;
pub mod observability;
pub mod password;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, AuthErrorKind, ErrorResponse, FaultOrigin};
pub use gate::{AuthGate, GateDecision, GateStage, Rejection, SubjectDirectory, VerifiedIdentity};
pub use jwt::{TokenIssuer, TokenType, TokenValidator, VerifiedClaims};
pub use keys::{KeyStoreError, SecretKeyStore};
pub use middleware::AuthGateLayer;
pub use password::{CredentialHasher, HashError, HasherConfig, HashingPool};
