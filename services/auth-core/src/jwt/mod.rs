//! Typed, expiring HMAC tokens.

pub mod claims;
pub mod issuer;
pub mod token;
pub mod validator;

pub use claims::{TokenClaims, TokenType, UnknownTokenType};
pub use issuer::{IssueError, TokenIssuer, TokenPair};
pub use token::{SignatureVerified, Token, TokenState, Unverified, Validated, ValidityWindow};
pub use validator::{TokenValidator, VerifiedClaims};
