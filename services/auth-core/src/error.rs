//! Request-path error handling.
//!
//! Every rejection the gate can produce is an [`AuthError`] variant. Each
//! variant maps to exactly one closed [`AuthErrorKind`], which decides the
//! fault origin and the HTTP status. Callers only ever see the sanitized
//! [`ErrorResponse`]; the variant detail stays in logs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::jwt::TokenType;

/// Errors raised while authenticating a request.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AuthError {
    /// The Authorization header is absent or empty
    #[error("Authorization header missing")]
    NoAuthorizationHeader,

    /// The header is not exactly `Bearer <token>`
    #[error("Authorization header malformed")]
    InvalidAuthorizationHeader,

    /// The token header names a non-HMAC algorithm
    #[error("Unexpected signing method: {algorithm}")]
    UnexpectedSigningMethod {
        /// Algorithm named in the token header
        algorithm: String,
    },

    /// HMAC check failed
    #[error("Token signature invalid")]
    InvalidTokenSignature,

    /// Verification could not be attempted (key resolution or crypto fault)
    #[error("Token could not be verified: {reason}")]
    TokenUnverifiable {
        /// Internal description
        reason: String,
    },

    /// Structural problem with the token or its claims
    #[error("Token malformed: {reason}")]
    TokenProblem {
        /// Description of the problem
        reason: String,
    },

    /// The `name` claim is missing or not a known token type
    #[error("Token type not supported: {claimed}")]
    TokenTypeNotSupported {
        /// Raw claimed value, empty when absent
        claimed: String,
    },

    /// Signature verified but the payload does not fit the claims layout
    #[error("Token claims invalid: {reason}")]
    InvalidTokenClaims {
        /// Deserializer message
        reason: String,
    },

    /// The validity window for the token type has passed
    #[error("Token expired at {expired_at}")]
    TokenExpired {
        /// `iat + validity`
        expired_at: DateTime<Utc>,
    },

    /// Valid token presented at an endpoint expecting another type
    #[error("Invalid token type: expected {expected}, got {actual}")]
    TokenTypeMismatch {
        /// Type the endpoint accepts
        expected: TokenType,
        /// Type carried by the token
        actual: TokenType,
    },

    /// The subject exists but is not active
    #[error("Subject is not active")]
    SubjectNotActive,

    /// The subject does not exist
    #[error("Subject not found")]
    SubjectNotFound,

    /// The subject directory failed
    #[error("Subject lookup failed")]
    SubjectLookupFailed(#[source] anyhow::Error),

    /// The subject directory did not answer in time
    #[error("Subject lookup timed out after {timeout:?}")]
    SubjectLookupTimedOut {
        /// Configured bound
        timeout: Duration,
    },

    /// A handler asked for the verified identity on an ungated route
    #[error("Verified identity missing from request context")]
    MissingIdentity,
}

/// Closed classification of [`AuthError`] used for status mapping and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// See [`AuthError::NoAuthorizationHeader`]
    HeaderMissing,
    /// See [`AuthError::InvalidAuthorizationHeader`]
    HeaderInvalid,
    /// See [`AuthError::UnexpectedSigningMethod`]
    SigningMethodUnexpected,
    /// See [`AuthError::InvalidTokenSignature`]
    SignatureInvalid,
    /// See [`AuthError::TokenUnverifiable`]
    TokenUnverifiable,
    /// See [`AuthError::TokenProblem`]
    TokenMalformed,
    /// See [`AuthError::TokenTypeNotSupported`]
    TokenTypeUnsupported,
    /// See [`AuthError::InvalidTokenClaims`]
    ClaimsInvalid,
    /// See [`AuthError::TokenExpired`]
    TokenExpired,
    /// See [`AuthError::TokenTypeMismatch`]
    TokenTypeMismatch,
    /// See [`AuthError::SubjectNotActive`]
    SubjectInactive,
    /// See [`AuthError::SubjectNotFound`]
    SubjectNotFound,
    /// See [`AuthError::SubjectLookupFailed`]
    SubjectLookupFailed,
    /// See [`AuthError::SubjectLookupTimedOut`]
    SubjectLookupTimeout,
    /// See [`AuthError::MissingIdentity`]
    IdentityMissing,
}

/// Who caused a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOrigin {
    /// The request was not acceptable
    Client,
    /// This process or a collaborator failed
    Server,
}

impl AuthErrorKind {
    /// Every kind, for exhaustive checks.
    pub const ALL: [Self; 15] = [
        Self::HeaderMissing,
        Self::HeaderInvalid,
        Self::SigningMethodUnexpected,
        Self::SignatureInvalid,
        Self::TokenUnverifiable,
        Self::TokenMalformed,
        Self::TokenTypeUnsupported,
        Self::ClaimsInvalid,
        Self::TokenExpired,
        Self::TokenTypeMismatch,
        Self::SubjectInactive,
        Self::SubjectNotFound,
        Self::SubjectLookupFailed,
        Self::SubjectLookupTimeout,
        Self::IdentityMissing,
    ];

    /// Stable machine-readable code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HeaderMissing => "AUTH_HEADER_MISSING",
            Self::HeaderInvalid => "AUTH_HEADER_INVALID",
            Self::SigningMethodUnexpected => "AUTH_SIGNING_METHOD_UNEXPECTED",
            Self::SignatureInvalid => "AUTH_TOKEN_SIGNATURE_INVALID",
            Self::TokenUnverifiable => "AUTH_TOKEN_UNVERIFIABLE",
            Self::TokenMalformed => "AUTH_TOKEN_MALFORMED",
            Self::TokenTypeUnsupported => "AUTH_TOKEN_TYPE_UNSUPPORTED",
            Self::ClaimsInvalid => "AUTH_CLAIMS_INVALID",
            Self::TokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::TokenTypeMismatch => "AUTH_TOKEN_TYPE_MISMATCH",
            Self::SubjectInactive => "AUTH_SUBJECT_INACTIVE",
            Self::SubjectNotFound => "AUTH_SUBJECT_NOT_FOUND",
            Self::SubjectLookupFailed => "SUBJECT_LOOKUP_FAILED",
            Self::SubjectLookupTimeout => "SUBJECT_LOOKUP_TIMEOUT",
            Self::IdentityMissing => "IDENTITY_MISSING",
        }
    }

    /// Fault origin of this kind.
    #[must_use]
    pub const fn origin(&self) -> FaultOrigin {
        match self {
            Self::TokenUnverifiable
            | Self::ClaimsInvalid
            | Self::SubjectLookupFailed
            | Self::SubjectLookupTimeout
            | Self::IdentityMissing => FaultOrigin::Server,
            Self::HeaderMissing
            | Self::HeaderInvalid
            | Self::SigningMethodUnexpected
            | Self::SignatureInvalid
            | Self::TokenMalformed
            | Self::TokenTypeUnsupported
            | Self::TokenExpired
            | Self::TokenTypeMismatch
            | Self::SubjectInactive
            | Self::SubjectNotFound => FaultOrigin::Client,
        }
    }

    /// HTTP status returned to the caller.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self.origin() {
            FaultOrigin::Client => StatusCode::UNAUTHORIZED,
            FaultOrigin::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AuthError {
    /// Classification of this error.
    #[must_use]
    pub const fn kind(&self) -> AuthErrorKind {
        match self {
            Self::NoAuthorizationHeader => AuthErrorKind::HeaderMissing,
            Self::InvalidAuthorizationHeader => AuthErrorKind::HeaderInvalid,
            Self::UnexpectedSigningMethod { .. } => AuthErrorKind::SigningMethodUnexpected,
            Self::InvalidTokenSignature => AuthErrorKind::SignatureInvalid,
            Self::TokenUnverifiable { .. } => AuthErrorKind::TokenUnverifiable,
            Self::TokenProblem { .. } => AuthErrorKind::TokenMalformed,
            Self::TokenTypeNotSupported { .. } => AuthErrorKind::TokenTypeUnsupported,
            Self::InvalidTokenClaims { .. } => AuthErrorKind::ClaimsInvalid,
            Self::TokenExpired { .. } => AuthErrorKind::TokenExpired,
            Self::TokenTypeMismatch { .. } => AuthErrorKind::TokenTypeMismatch,
            Self::SubjectNotActive => AuthErrorKind::SubjectInactive,
            Self::SubjectNotFound => AuthErrorKind::SubjectNotFound,
            Self::SubjectLookupFailed(_) => AuthErrorKind::SubjectLookupFailed,
            Self::SubjectLookupTimedOut { .. } => AuthErrorKind::SubjectLookupTimeout,
            Self::MissingIdentity => AuthErrorKind::IdentityMissing,
        }
    }

    /// Fault origin.
    #[must_use]
    pub const fn origin(&self) -> FaultOrigin {
        self.kind().origin()
    }

    /// HTTP status returned to the caller.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.kind().status()
    }

    /// Shorthand for [`AuthError::TokenProblem`].
    pub(crate) fn problem(reason: impl Into<String>) -> Self {
        Self::TokenProblem {
            reason: reason.into(),
        }
    }
}

/// Sanitized caller-facing error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error kind
    pub kind: AuthErrorKind,
    /// HTTP status
    pub status: StatusCode,
    /// Generic message, never variant detail
    pub message: &'static str,
    /// Correlation ID for matching the response to logs
    pub correlation_id: Uuid,
}

impl ErrorResponse {
    /// Builds the response for `error`.
    #[must_use]
    pub const fn from_error(error: &AuthError, correlation_id: Uuid) -> Self {
        let kind = error.kind();
        let message = match kind.origin() {
            FaultOrigin::Client => "Unauthorized",
            // Never expose internal error details
            FaultOrigin::Server => "Internal error",
        };

        Self {
            kind,
            status: kind.status(),
            message,
            correlation_id,
        }
    }
}
