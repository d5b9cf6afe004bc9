//! Token validator driving the type-state pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AuthError;
use crate::jwt::claims::TokenType;
use crate::jwt::token::{SignatureVerified, Token, Unverified, Validated};
use crate::keys::SecretKeyStore;

/// Output of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedClaims {
    /// Non-empty subject
    pub subject: String,
    /// Authenticated token type
    pub token_type: TokenType,
    /// Stay-signed-in flag carried by the token
    pub remember_me: bool,
    /// Issue instant
    pub issued_at: DateTime<Utc>,
    /// Expiry instant (inclusive)
    pub expires_at: DateTime<Utc>,
}

impl From<Token<Validated>> for VerifiedClaims {
    fn from(token: Token<Validated>) -> Self {
        let (claims, issued_at, expires_at) = token.into_parts();
        Self {
            subject: claims.sub,
            token_type: claims.token_type,
            remember_me: claims.remember_me,
            issued_at,
            expires_at,
        }
    }
}

/// Validates bearer tokens against a [`SecretKeyStore`].
#[derive(Debug, Clone)]
pub struct TokenValidator {
    keys: Arc<SecretKeyStore>,
}

impl TokenValidator {
    /// Creates a validator sharing `keys`.
    #[must_use]
    pub const fn new(keys: Arc<SecretKeyStore>) -> Self {
        Self { keys }
    }

    /// Key store in use.
    #[must_use]
    pub fn keys(&self) -> &SecretKeyStore {
        &self.keys
    }

    /// Extracts the token from an `Authorization` header value.
    ///
    /// The value must be exactly `Bearer <token>` separated by one space.
    ///
    /// # Errors
    ///
    /// [`AuthError::NoAuthorizationHeader`] when absent or empty,
    /// [`AuthError::InvalidAuthorizationHeader`] for any other shape.
    pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
        let header = header
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::NoAuthorizationHeader)?;

        if !header.bytes().all(|b| b == b' ' || b.is_ascii_graphic()) {
            return Err(AuthError::InvalidAuthorizationHeader);
        }

        let parts: Vec<&str> = header.split(' ').collect();
        match parts.as_slice() {
            ["Bearer", token] if !token.is_empty() => Ok(*token),
            _ => Err(AuthError::InvalidAuthorizationHeader),
        }
    }

    /// Parses `token` and verifies its signature with the claimed type's key.
    ///
    /// # Errors
    ///
    /// Structural, algorithm, type and signature errors.
    pub fn verify_signature(&self, token: &str) -> Result<Token<SignatureVerified>, AuthError> {
        Token::<Unverified>::parse(token)?.verify_signature(&self.keys)
    }

    /// Validates an `Authorization` header value now.
    ///
    /// # Errors
    ///
    /// Any stage failure, see [`TokenValidator::validate_at`].
    pub fn validate(&self, header: Option<&str>) -> Result<VerifiedClaims, AuthError> {
        self.validate_at(header, Utc::now())
    }

    /// Validates an `Authorization` header value at `now`.
    ///
    /// # Errors
    ///
    /// The first failing stage: presence, shape, parse, signature, expiry,
    /// subject.
    pub fn validate_at(
        &self,
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedClaims, AuthError> {
        let token = Self::parse_bearer(header)?;
        self.validate_token_at(token, now)
    }

    /// Validates a bare compact token at `now`.
    ///
    /// # Errors
    ///
    /// As [`TokenValidator::validate_at`] minus the header stages.
    pub fn validate_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedClaims, AuthError> {
        let validated = self.verify_signature(token)?.validate_at(&self.keys, now)?;
        Ok(validated.into())
    }
}
