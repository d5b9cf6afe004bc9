//! Subject activity lookup supplied by the host application.

use async_trait::async_trait;
use thiserror::Error;

/// Lookup failures.
#[derive(Error, Debug)]
pub enum SubjectLookupError {
    /// No such subject
    #[error("subject not found")]
    NotFound,

    /// The backing store failed
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Answers whether a subject exists and may authenticate.
#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    /// `Ok(true)` for an active subject, `Ok(false)` for an inactive one.
    async fn is_active(&self, subject: &str) -> Result<bool, SubjectLookupError>;
}
