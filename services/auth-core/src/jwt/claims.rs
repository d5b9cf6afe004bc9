//! Token types and the claims carried in the payload.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of token types.
///
/// Each type has its own signing secret and validity window. The serialized
/// form travels in the `name` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    /// Short-lived token for ordinary endpoints
    #[serde(rename = "ACCESS_TOKEN")]
    Access,
    /// Long-lived token used to mint new access tokens
    #[serde(rename = "REFRESH_TOKEN")]
    Refresh,
    /// Short-lived token for account-settings endpoints
    #[serde(rename = "SETTINGS_ACCESS_TOKEN")]
    SettingsAccess,
}

impl TokenType {
    /// Every token type, in configuration order.
    pub const ALL: [Self; 3] = [Self::Access, Self::Refresh, Self::SettingsAccess];

    /// Wire tag carried in the `name` claim.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "ACCESS_TOKEN",
            Self::Refresh => "REFRESH_TOKEN",
            Self::SettingsAccess => "SETTINGS_ACCESS_TOKEN",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `name` claim that does not match any known token type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported token type: {0}")]
pub struct UnknownTokenType(pub String);

impl FromStr for TokenType {
    type Err = UnknownTokenType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCESS_TOKEN" => Ok(Self::Access),
            "REFRESH_TOKEN" => Ok(Self::Refresh),
            "SETTINGS_ACCESS_TOKEN" => Ok(Self::SettingsAccess),
            other => Err(UnknownTokenType(other.to_string())),
        }
    }
}

/// Signed token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Opaque subject identifier (an email address in this deployment)
    pub sub: String,
    /// Token type tag
    #[serde(rename = "name")]
    pub token_type: TokenType,
    /// Issued-at, seconds since the Unix epoch
    pub iat: i64,
    /// Whether the user asked to stay signed in
    #[serde(default)]
    pub remember_me: bool,
}

impl TokenClaims {
    /// Builds claims stamped with `issued_at`.
    pub fn new(
        subject: impl Into<String>,
        token_type: TokenType,
        remember_me: bool,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: subject.into(),
            token_type,
            iat: issued_at.timestamp(),
            remember_me,
        }
    }

    /// Issued-at as a timestamp, if representable.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    /// Expiry instant for a given validity window.
    #[must_use]
    pub fn expires_at(&self, validity: Duration) -> Option<DateTime<Utc>> {
        self.issued_at()
            .and_then(|issued| issued.checked_add_signed(validity))
    }

    /// Flat expiry check: valid up to and including `iat + validity`.
    ///
    /// Claims whose expiry cannot be represented are treated as expired.
    #[must_use]
    pub fn is_expired_at(&self, validity: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at(validity).is_none_or(|expiry| now > expiry)
    }
}
