//! Type-state token with compile-time validation guarantees.
//!
//! Claims are unreadable on a `Token<Unverified>`, peekable once the
//! signature has been checked, and fully trusted only on `Token<Validated>`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::error::AuthError;
use crate::jwt::claims::{TokenClaims, TokenType};
use crate::keys::SecretKeyStore;

mod private {
    /// Sealed trait to prevent external implementations
    pub trait Sealed {}
}

/// Marker trait for token validation states
pub trait TokenState: private::Sealed {
    /// Human-readable state name for debugging
    fn state_name() -> &'static str;
}

/// Structurally parsed, nothing verified
#[derive(Debug)]
pub struct Unverified {
    payload: Map<String, Value>,
}
impl private::Sealed for Unverified {}
impl TokenState for Unverified {
    fn state_name() -> &'static str {
        "Unverified"
    }
}

/// HMAC verified against the key of the claimed type
#[derive(Debug)]
pub struct SignatureVerified {
    claims: TokenClaims,
}
impl private::Sealed for SignatureVerified {}
impl TokenState for SignatureVerified {
    fn state_name() -> &'static str {
        "SignatureVerified"
    }
}

/// Signature, expiry and subject checked
#[derive(Debug)]
pub struct Validated {
    claims: TokenClaims,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}
impl private::Sealed for Validated {}
impl TokenState for Validated {
    fn state_name() -> &'static str {
        "Validated"
    }
}

/// Compact JWS moving through the validation states.
#[derive(Debug)]
pub struct Token<S: TokenState> {
    raw: String,
    algorithm: Algorithm,
    state: S,
}

impl Token<Unverified> {
    /// Parses the three segments and checks the header algorithm.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenProblem`] for structural faults,
    /// [`AuthError::UnexpectedSigningMethod`] for a non-HMAC algorithm.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let segments: Vec<&str> = raw.split('.').collect();
        let [header, payload, _signature] = segments.as_slice() else {
            return Err(AuthError::problem(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };

        let header = decode_segment(header, "header")?;
        let algorithm = match header.get("alg").and_then(Value::as_str) {
            Some("HS256") => Algorithm::HS256,
            Some("HS384") => Algorithm::HS384,
            Some("HS512") => Algorithm::HS512,
            Some(other) => {
                return Err(AuthError::UnexpectedSigningMethod {
                    algorithm: other.to_string(),
                });
            }
            None => return Err(AuthError::problem("header has no alg")),
        };

        decode_header(raw).map_err(|e| AuthError::problem(format!("invalid header: {e}")))?;
        let payload = decode_segment(payload, "payload")?;

        Ok(Self {
            raw: raw.to_string(),
            algorithm,
            state: Unverified { payload },
        })
    }

    /// Token type named by the unverified `name` claim.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenTypeNotSupported`] if the claim is absent, not a
    /// string, or not a known type.
    pub fn claimed_type(&self) -> Result<TokenType, AuthError> {
        match self.state.payload.get("name") {
            Some(Value::String(name)) => name
                .parse()
                .map_err(|_| AuthError::TokenTypeNotSupported {
                    claimed: name.clone(),
                }),
            Some(other) => Err(AuthError::TokenTypeNotSupported {
                claimed: other.to_string(),
            }),
            None => Err(AuthError::TokenTypeNotSupported {
                claimed: String::new(),
            }),
        }
    }

    /// Verifies the HMAC with the key of the claimed type.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenTypeNotSupported`] for an unknown type,
    /// [`AuthError::TokenUnverifiable`] when the store has no key for it,
    /// plus the errors of [`Token::verify_signature_with_key`].
    pub fn verify_signature(
        self,
        keys: &SecretKeyStore,
    ) -> Result<Token<SignatureVerified>, AuthError> {
        let token_type = self.claimed_type()?;
        let key = keys
            .resolve(token_type)
            .map_err(|e| AuthError::TokenUnverifiable {
                reason: e.to_string(),
            })?;
        self.verify_signature_with_key(key.secret())
    }

    /// Verifies the HMAC with an explicit secret.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidTokenSignature`] on a bad MAC,
    /// [`AuthError::InvalidTokenClaims`] when a verified payload does not
    /// fit [`TokenClaims`], [`AuthError::TokenUnverifiable`] on key or crypto
    /// faults, [`AuthError::TokenProblem`] otherwise.
    pub fn verify_signature_with_key(
        self,
        secret: &[u8],
    ) -> Result<Token<SignatureVerified>, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<TokenClaims>(&self.raw, &DecodingKey::from_secret(secret), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidTokenSignature,
                ErrorKind::InvalidAlgorithm => AuthError::UnexpectedSigningMethod {
                    algorithm: format!("{:?}", self.algorithm),
                },
                ErrorKind::Json(err) => AuthError::InvalidTokenClaims {
                    reason: err.to_string(),
                },
                ErrorKind::InvalidKeyFormat | ErrorKind::Crypto(_) => {
                    AuthError::TokenUnverifiable {
                        reason: e.to_string(),
                    }
                }
                _ => AuthError::problem(e.to_string()),
            })?;

        Ok(Token {
            raw: self.raw,
            algorithm: self.algorithm,
            state: SignatureVerified {
                claims: data.claims,
            },
        })
    }
}

impl Token<SignatureVerified> {
    /// Read-only view of the authenticated but not yet validated claims.
    #[must_use]
    pub const fn peek_claims(&self) -> &TokenClaims {
        &self.state.claims
    }

    /// Authenticated token type.
    #[must_use]
    pub const fn token_type(&self) -> TokenType {
        self.state.claims.token_type
    }

    /// Checks expiry and subject, looking the validity up in `keys`.
    ///
    /// # Errors
    ///
    /// See [`Token::validate_with_validity`]; additionally
    /// [`AuthError::TokenUnverifiable`] if the store lacks the type.
    pub fn validate_at(
        self,
        keys: &SecretKeyStore,
        now: DateTime<Utc>,
    ) -> Result<Token<Validated>, AuthError> {
        let window = self.window_at(keys, now)?;
        self.ensure_subject()?;
        Ok(self.into_validated(window))
    }

    /// Checks expiry against an explicit window, then the subject.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenExpired`] when `now > iat + validity`,
    /// [`AuthError::TokenProblem`] for an empty subject.
    pub fn validate_with_validity(
        self,
        validity: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<Token<Validated>, AuthError> {
        let window = self.window_with_validity(validity, now)?;
        self.ensure_subject()?;
        Ok(self.into_validated(window))
    }

    /// Expiry check using the type's validity from `keys`.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenUnverifiable`] if the store lacks the type,
    /// [`AuthError::TokenExpired`] once `now > iat + validity`.
    pub fn window_at(
        &self,
        keys: &SecretKeyStore,
        now: DateTime<Utc>,
    ) -> Result<ValidityWindow, AuthError> {
        let validity = keys
            .validity(self.token_type())
            .map_err(|e| AuthError::TokenUnverifiable {
                reason: e.to_string(),
            })?;
        self.window_with_validity(validity, now)
    }

    /// Expiry check against an explicit validity. The expiry instant itself
    /// is still valid.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenExpired`] once `now > iat + validity`, or when the
    /// issue instant is unrepresentable.
    pub fn window_with_validity(
        &self,
        validity: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<ValidityWindow, AuthError> {
        let claims = &self.state.claims;
        match (claims.issued_at(), claims.expires_at(validity)) {
            (Some(issued_at), Some(expires_at)) if now <= expires_at => Ok(ValidityWindow {
                issued_at,
                expires_at,
            }),
            (_, expiry) => Err(AuthError::TokenExpired {
                expired_at: expiry.unwrap_or(now),
            }),
        }
    }

    /// Subject check.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenProblem`] for an empty subject.
    pub fn ensure_subject(&self) -> Result<(), AuthError> {
        if self.state.claims.sub.is_empty() {
            return Err(AuthError::problem("empty subject"));
        }
        Ok(())
    }

    /// Promotes the token once both checks have passed.
    pub(crate) fn into_validated(self, window: ValidityWindow) -> Token<Validated> {
        Token {
            raw: self.raw,
            algorithm: self.algorithm,
            state: Validated {
                claims: self.state.claims,
                issued_at: window.issued_at,
                expires_at: window.expires_at,
            },
        }
    }
}

/// Issue and expiry instants of a token that has not expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    /// Issue instant
    pub issued_at: DateTime<Utc>,
    /// Last valid instant
    pub expires_at: DateTime<Utc>,
}

impl Token<Validated> {
    /// Fully validated claims.
    #[must_use]
    pub const fn claims(&self) -> &TokenClaims {
        &self.state.claims
    }

    /// Subject claim, guaranteed non-empty.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.state.claims.sub
    }

    /// Token type.
    #[must_use]
    pub const fn token_type(&self) -> TokenType {
        self.state.claims.token_type
    }

    /// Issue instant.
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.state.issued_at
    }

    /// Expiry instant (inclusive).
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.state.expires_at
    }

    /// Consumes the token, returning claims and both instants.
    #[must_use]
    pub fn into_parts(self) -> (TokenClaims, DateTime<Utc>, DateTime<Utc>) {
        (self.state.claims, self.state.issued_at, self.state.expires_at)
    }
}

impl<S: TokenState> Token<S> {
    /// Current state name.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }

    /// Header algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Compact serialization as presented.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn decode_segment(segment: &str, what: &str) -> Result<Map<String, Value>, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::problem(format!("{what} is not base64url: {e}")))?;

    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AuthError::problem(format!("{what} is not a JSON object"))),
        Err(e) => Err(AuthError::problem(format!("{what} is not JSON: {e}"))),
    }
}
