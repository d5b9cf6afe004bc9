//! Verified identity handed to handlers through request extensions.

use http::Extensions;

use crate::error::AuthError;

/// Authenticated caller attached to a request by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    subject: String,
    remember_me: bool,
}

impl VerifiedIdentity {
    pub(crate) const fn new(subject: String, remember_me: bool) -> Self {
        Self {
            subject,
            remember_me,
        }
    }

    /// Verified, active subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Stay-signed-in flag carried by the token.
    #[must_use]
    pub const fn remember_me(&self) -> bool {
        self.remember_me
    }

    /// Reads the identity a gated route inserted.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingIdentity`] when the route was not gated.
    pub fn from_extensions(extensions: &Extensions) -> Result<&Self, AuthError> {
        extensions.get::<Self>().ok_or(AuthError::MissingIdentity)
    }
}
