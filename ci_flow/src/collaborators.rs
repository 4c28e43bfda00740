//! Contracts for the external services the engine calls.
//!
//! The build runner, the pull request comment API and the log store are
//! injected into the [`Dispatcher`](crate::Dispatcher) as trait objects so
//! that the host can wire real clients and tests can wire recording fakes.
//! Every call is a single request/response; retries are the host's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::trigger::BuildStartRequest;

/// Failure reported by a collaborator call.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("{service} returned {status} ({code}): {message}")]
    Service {
        service: String,
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Identity of a build the runner accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedBuild {
    pub arn: String,
    pub id: String,
}

/// Parameters for posting a comment on a pull request.
///
/// `before_commit_id` is the destination commit and `after_commit_id` the
/// source commit, so the comment renders against the pull request diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentRequest {
    pub repository_name: String,
    pub pull_request_id: String,
    pub before_commit_id: String,
    pub after_commit_id: String,
    pub content: String,
    pub client_request_token: String,
}

/// Tail query against a log stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub log_group_name: String,
    pub log_stream_name: String,
    pub limit: u32,
    pub start_from_head: bool,
}

impl LogQuery {
    /// Number of trailing log lines attached to a failure report.
    pub const TAIL_LIMIT: u32 = 30;

    /// Query for the last [`Self::TAIL_LIMIT`] events of a stream.
    pub fn tail(log_group_name: impl Into<String>, log_stream_name: impl Into<String>) -> Self {
        Self {
            log_group_name: log_group_name.into(),
            log_stream_name: log_stream_name.into(),
            limit: Self::TAIL_LIMIT,
            start_from_head: false,
        }
    }
}

/// One log line. Other fields of the log store's event are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,
}

/// Job-execution service.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    async fn start_build(
        &self,
        request: BuildStartRequest,
    ) -> Result<StartedBuild, CollaboratorError>;
}

/// Pull request comment API.
#[async_trait]
pub trait CommentPoster: Send + Sync {
    async fn post_comment(&self, request: PostCommentRequest) -> Result<(), CollaboratorError>;
}

/// Build log store.
#[async_trait]
pub trait LogReader: Send + Sync {
    async fn get_log_events(&self, query: LogQuery) -> Result<Vec<LogEvent>, CollaboratorError>;
}
