//! Token issuance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use thiserror::Error;

use crate::jwt::claims::{TokenClaims, TokenType};
use crate::jwt::validator::VerifiedClaims;
use crate::keys::SecretKeyStore;

/// Issuance errors.
#[derive(Error, Debug)]
pub enum IssueError {
    /// The store has no key for the requested type
    #[error("no signing key for {token_type}")]
    UnknownTokenType {
        /// Requested type
        token_type: TokenType,
    },

    /// Subject must be non-empty
    #[error("subject must not be empty")]
    EmptySubject,

    /// Reissue was asked for with something other than a refresh token
    #[error("expected a refresh token, got {actual}")]
    NotRefreshToken {
        /// Type that was presented
        actual: TokenType,
    },

    /// The JWT library failed to sign
    #[error("signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Access and refresh tokens minted together at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Short-lived access token
    pub access_token: String,
    /// Long-lived refresh token
    pub refresh_token: String,
}

/// Signs HS256 tokens with the per-type secrets of a [`SecretKeyStore`].
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    keys: Arc<SecretKeyStore>,
}

impl TokenIssuer {
    /// Creates an issuer sharing `keys`.
    #[must_use]
    pub const fn new(keys: Arc<SecretKeyStore>) -> Self {
        Self { keys }
    }

    /// Issues a token stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::issue_at`].
    pub fn issue(
        &self,
        subject: &str,
        token_type: TokenType,
        remember_me: bool,
    ) -> Result<String, IssueError> {
        self.issue_at(subject, token_type, remember_me, Utc::now())
    }

    /// Issues a token stamped with `issued_at`.
    ///
    /// # Errors
    ///
    /// [`IssueError::EmptySubject`], [`IssueError::UnknownTokenType`], or
    /// [`IssueError::Signing`].
    pub fn issue_at(
        &self,
        subject: &str,
        token_type: TokenType,
        remember_me: bool,
        issued_at: DateTime<Utc>,
    ) -> Result<String, IssueError> {
        if subject.is_empty() {
            return Err(IssueError::EmptySubject);
        }

        let key = self
            .keys
            .resolve(token_type)
            .map_err(|_| IssueError::UnknownTokenType { token_type })?;

        let claims = TokenClaims::new(subject, token_type, remember_me, issued_at);
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(key.secret()),
        )?;

        tracing::debug!(token_type = %token_type, iat = claims.iat, "token issued");
        Ok(token)
    }

    /// Issues an access and refresh token sharing one issue instant.
    ///
    /// # Errors
    ///
    /// As [`TokenIssuer::issue_at`].
    pub fn issue_pair(&self, subject: &str, remember_me: bool) -> Result<TokenPair, IssueError> {
        let now = Utc::now();
        Ok(TokenPair {
            access_token: self.issue_at(subject, TokenType::Access, remember_me, now)?,
            refresh_token: self.issue_at(subject, TokenType::Refresh, remember_me, now)?,
        })
    }

    /// Mints a new access token from verified refresh-token claims.
    ///
    /// The refresh token itself is not reissued, so its `iat` still bounds
    /// the session.
    ///
    /// # Errors
    ///
    /// [`IssueError::NotRefreshToken`] for any other type, otherwise as
    /// [`TokenIssuer::issue_at`].
    pub fn reissue_access(&self, refresh: &VerifiedClaims) -> Result<String, IssueError> {
        if refresh.token_type != TokenType::Refresh {
            return Err(IssueError::NotRefreshToken {
                actual: refresh.token_type,
            });
        }
        self.issue(&refresh.subject, TokenType::Access, refresh.remember_me)
    }
}
