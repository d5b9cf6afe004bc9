//! Request gate: `Authorization` header in, active verified identity out.
//!
//! Stages run strictly in order and the first failure rejects:
//!
//! ```text
//! Start -> HeaderParsed -> SignatureVerified -> TypeMatched -> NotExpired
//!       -> SubjectExtracted -> SubjectActive -> Allowed
//! ```
//!
//! A [`Rejection`] records the last stage that passed.

pub mod directory;
pub mod identity;

pub use directory::{SubjectDirectory, SubjectLookupError};
pub use identity::VerifiedIdentity;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::jwt::{TokenType, TokenValidator, VerifiedClaims};

/// Default bound on the subject lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Gate pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GateStage {
    /// Nothing checked yet
    Start,
    /// `Bearer <token>` extracted
    HeaderParsed,
    /// HMAC verified with the claimed type's key
    SignatureVerified,
    /// Token type equals the route's expected type
    TypeMatched,
    /// Within the validity window
    NotExpired,
    /// Non-empty subject read from the claims
    SubjectExtracted,
    /// Directory reports the subject active
    SubjectActive,
    /// Identity attached
    Allowed,
}

impl GateStage {
    /// Stage name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::HeaderParsed => "header_parsed",
            Self::SignatureVerified => "signature_verified",
            Self::TypeMatched => "type_matched",
            Self::NotExpired => "not_expired",
            Self::SubjectExtracted => "subject_extracted",
            Self::SubjectActive => "subject_active",
            Self::Allowed => "allowed",
        }
    }
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected request and the last stage it passed.
#[derive(Debug)]
pub struct Rejection {
    /// Last stage reached
    pub stage: GateStage,
    /// Cause
    pub error: AuthError,
}

/// Outcome of [`AuthGate::evaluate`].
#[derive(Debug)]
pub enum GateDecision {
    /// Attach this identity and continue
    Allowed(VerifiedIdentity),
    /// Answer with the mapped status
    Rejected(Rejection),
}

impl GateDecision {
    /// Converts into a `Result`.
    ///
    /// # Errors
    ///
    /// The [`Rejection`] if the request was rejected.
    pub fn into_result(self) -> Result<VerifiedIdentity, Rejection> {
        match self {
            Self::Allowed(identity) => Ok(identity),
            Self::Rejected(rejection) => Err(rejection),
        }
    }

    /// Whether the request was allowed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// Per-route gate accepting one token type.
#[derive(Clone)]
pub struct AuthGate {
    validator: TokenValidator,
    expected: TokenType,
    directory: Arc<dyn SubjectDirectory>,
    lookup_timeout: Duration,
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("expected", &self.expected)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    /// Creates a gate for routes that accept `expected` tokens.
    #[must_use]
    pub fn new(
        validator: TokenValidator,
        expected: TokenType,
        directory: Arc<dyn SubjectDirectory>,
    ) -> Self {
        Self {
            validator,
            expected,
            directory,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Creates a gate bounded by the configured subject lookup timeout.
    #[must_use]
    pub fn from_config(
        validator: TokenValidator,
        expected: TokenType,
        directory: Arc<dyn SubjectDirectory>,
        config: &AuthConfig,
    ) -> Self {
        Self::new(validator, expected, directory).with_lookup_timeout(config.subject_lookup_timeout)
    }

    /// Current bound on the subject lookup.
    #[must_use]
    pub const fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    /// Overrides the subject lookup bound.
    #[must_use]
    pub const fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Token type this gate accepts.
    #[must_use]
    pub const fn expected(&self) -> TokenType {
        self.expected
    }

    /// Runs the pipeline against an `Authorization` header value now.
    pub async fn evaluate(&self, header: Option<&str>) -> GateDecision {
        self.evaluate_at(header, Utc::now()).await
    }

    /// Runs the pipeline with an explicit clock.
    pub async fn evaluate_at(&self, header: Option<&str>, now: DateTime<Utc>) -> GateDecision {
        let mut stage = GateStage::Start;

        let claims = match self.check_token(header, now, &mut stage) {
            Ok(claims) => claims,
            Err(error) => return GateDecision::Rejected(Rejection { stage, error }),
        };

        if let Err(error) = self.check_active(&claims.subject).await {
            return GateDecision::Rejected(Rejection { stage, error });
        }

        GateDecision::Allowed(VerifiedIdentity::new(claims.subject, claims.remember_me))
    }

    fn check_token(
        &self,
        header: Option<&str>,
        now: DateTime<Utc>,
        stage: &mut GateStage,
    ) -> Result<VerifiedClaims, AuthError> {
        let token = TokenValidator::parse_bearer(header)?;
        *stage = GateStage::HeaderParsed;

        let verified = self.validator.verify_signature(token)?;
        *stage = GateStage::SignatureVerified;

        let actual = verified.token_type();
        if actual != self.expected {
            return Err(AuthError::TokenTypeMismatch {
                expected: self.expected,
                actual,
            });
        }
        *stage = GateStage::TypeMatched;

        let window = verified.window_at(self.validator.keys(), now)?;
        *stage = GateStage::NotExpired;

        verified.ensure_subject()?;
        *stage = GateStage::SubjectExtracted;

        let claims = VerifiedClaims::from(verified.into_validated(window));

        Ok(claims)
    }

    async fn check_active(&self, subject: &str) -> Result<(), AuthError> {
        let lookup = tokio::time::timeout(self.lookup_timeout, self.directory.is_active(subject));

        match lookup.await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(AuthError::SubjectNotActive),
            Ok(Err(SubjectLookupError::NotFound)) => Err(AuthError::SubjectNotFound),
            Ok(Err(SubjectLookupError::Backend(e))) => Err(AuthError::SubjectLookupFailed(e)),
            Err(_) => Err(AuthError::SubjectLookupTimedOut {
                timeout: self.lookup_timeout,
            }),
        }
    }
}
