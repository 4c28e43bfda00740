//! Invocation-level errors.

use thiserror::Error;

use crate::collaborators::CollaboratorError;
use crate::events::EventError;

/// Errors that fail an invocation.
///
/// Log-fetch failures never surface here: the status reporter logs them and
/// posts the comment without an excerpt.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Malformed event: {0}")]
    MalformedEvent(#[from] EventError),

    #[error("StartBuild failed: {0}")]
    StartBuild(#[source] CollaboratorError),

    #[error("PostComment failed: {0}")]
    PostComment(#[source] CollaboratorError),
}

impl FlowError {
    /// Short machine-readable category.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MalformedEvent(_) => "malformed_event",
            Self::StartBuild(_) => "start_build",
            Self::PostComment(_) => "post_comment",
        }
    }
}

/// Result type for dispatcher operations
pub type Result<T> = std::result::Result<T, FlowError>;
