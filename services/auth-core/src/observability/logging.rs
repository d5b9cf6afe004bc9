//! Structured gate events.
//!
//! Client faults are routine and logged at debug; server faults at error.
//! Raw tokens and secrets never reach these functions.

use tracing::{debug, error};
use uuid::Uuid;

use crate::error::FaultOrigin;
use crate::gate::{GateStage, Rejection, VerifiedIdentity};
use crate::jwt::TokenType;

/// Logs a successful gate evaluation.
pub fn log_allowed(identity: &VerifiedIdentity, expected: TokenType, correlation_id: Uuid) {
    debug!(
        correlation_id = %correlation_id,
        subject = identity.subject(),
        token_type = %expected,
        stage = %GateStage::Allowed,
        "request authenticated"
    );
}

/// Logs a rejection at the level its fault origin calls for.
pub fn log_rejection(rejection: &Rejection, expected: TokenType, correlation_id: Uuid) {
    let kind = rejection.error.kind();

    match kind.origin() {
        FaultOrigin::Client => debug!(
            correlation_id = %correlation_id,
            error_code = kind.as_str(),
            stage = %rejection.stage,
            token_type = %expected,
            reason = %rejection.error,
            "request rejected"
        ),
        FaultOrigin::Server => error!(
            correlation_id = %correlation_id,
            error_code = kind.as_str(),
            stage = %rejection.stage,
            token_type = %expected,
            error = ?rejection.error,
            "authentication failed on server side"
        ),
    }
}
