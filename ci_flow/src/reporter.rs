//! Build status reporting on pull requests.
//!
//! A build state change is turned into a Markdown comment on the pull
//! request that triggered the build:
//!
//! ```text
//! ![<badge>](<badge url> "<badge>")
//!
//! Build `<uuid>` for project `<project>` <status prose>Visit the [AWS CodeBuild console](<url>) to view the build details.
//! ```
//!
//! Failed and timed-out builds get the tail of the build log appended as a
//! fenced block. The comment token is `build ARN + status`, so the same build
//! reaching the same status twice posts under the same token.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collaborators::{CommentPoster, LogQuery, LogReader, PostCommentRequest};
use crate::error::{FlowError, Result};
use crate::events::{BuildStateChange, EventError};
use crate::params::PullRequestRef;

/// Build status as reported by the build runner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    InProgress,
    Succeeded,
    Stopped,
    TimedOut,
    Failed,
    Fault,
    /// Any status this engine does not know by name.
    Other(String),
}

impl BuildStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Succeeded => "SUCCEEDED",
            Self::Stopped => "STOPPED",
            Self::TimedOut => "TIMED_OUT",
            Self::Failed => "FAILED",
            Self::Fault => "FAULT",
            Self::Other(status) => status,
        }
    }

    /// Badge and prose fragment for the status line.
    pub fn presentation(&self) -> (Badge, &'static str) {
        match self {
            Self::InProgress => (Badge::InProgress, "is **IN PROGRESS**. "),
            Self::Succeeded => (Badge::Passing, "**SUCCEEDED**! "),
            Self::Stopped => (Badge::Failing, "was **CANCELED**. "),
            Self::TimedOut => (Badge::Failing, "**TIMED OUT**. "),
            Self::Failed | Self::Fault | Self::Other(_) => (Badge::Failing, "**FAILED**. "),
        }
    }

    /// Whether a report for this status carries the build log tail.
    pub fn wants_log_excerpt(&self) -> bool {
        !matches!(self, Self::InProgress | Self::Succeeded | Self::Stopped)
    }
}

impl From<String> for BuildStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "IN_PROGRESS" => Self::InProgress,
            "SUCCEEDED" => Self::Succeeded,
            "STOPPED" => Self::Stopped,
            "TIMED_OUT" => Self::TimedOut,
            "FAILED" => Self::Failed,
            "FAULT" => Self::Fault,
            _ => Self::Other(status),
        }
    }
}

impl From<&str> for BuildStatus {
    fn from(status: &str) -> Self {
        Self::from(status.to_string())
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome category shown as a badge image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Passing,
    Failing,
    InProgress,
}

impl Badge {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Passing => "passing",
            Self::Failing => "failing",
            Self::InProgress => "inProgress",
        }
    }

    /// Markdown image referencing the region's static badge asset.
    pub fn markdown(&self, region: &str) -> String {
        let key = self.key();
        format!(
            "![{key}](https://s3.{region}.amazonaws.com/\
             codefactory-{region}-prod-default-build-badges/{key}.svg \"{key}\")"
        )
    }
}

/// Everything the reporter needs from a build state change of a
/// pull-request build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReviewContext {
    pub build_arn: String,
    pub build_id: String,
    pub build_uuid: String,
    pub project_name: String,
    pub status: BuildStatus,
    pub region: String,
    pub source_location: Option<String>,
    pub pull_request: PullRequestRef,
    pub log_group: Option<String>,
    pub log_stream: Option<String>,
}

impl BuildReviewContext {
    /// Context for a build started for a pull request, or `None` when the
    /// echoed variables do not name one. The build identity is only required
    /// once the build is known to belong to a pull request.
    pub fn from_event(
        region: Option<&str>,
        detail: &BuildStateChange,
    ) -> std::result::Result<Option<Self>, EventError> {
        let info = &detail.additional_information;
        let Some(pull_request) = PullRequestRef::from_variables(&info.environment.environment_variables)
        else {
            return Ok(None);
        };

        let region = region.ok_or_else(|| EventError::MissingField("region".to_string()))?;
        let build_arn = required(detail.build_id.as_deref(), "build-id")?;
        let project_name = required(detail.project_name.as_deref(), "project-name")?;
        let status = detail
            .build_status
            .clone()
            .ok_or_else(|| EventError::MissingField("detail.build-status".to_string()))?;

        let build_id = last_segment(build_arn, '/').to_string();
        let build_uuid = last_segment(&build_id, ':').to_string();
        let logs = info.logs.clone().unwrap_or_default();

        Ok(Some(Self {
            build_arn: build_arn.to_string(),
            build_id,
            build_uuid,
            project_name: project_name.to_string(),
            status,
            region: region.to_string(),
            source_location: info.source.as_ref().and_then(|source| source.location.clone()),
            pull_request,
            log_group: logs.group_name,
            log_stream: logs.stream_name,
        }))
    }

    /// Repository name: the last path segment of the source location.
    pub fn repository_name(&self) -> Option<&str> {
        self.source_location
            .as_deref()
            .map(|location| last_segment(location, '/'))
    }

    pub fn console_url(&self) -> String {
        let region = &self.region;
        format!(
            "https://{region}.console.aws.amazon.com/codebuild/home?region={region}#/builds/{}/view/new",
            encode_build_id(&self.build_id)
        )
    }

    /// Both log coordinates, when the event carried non-empty ones.
    fn log_stream_ref(&self) -> Option<(&str, &str)> {
        let group = self.log_group.as_deref().filter(|g| !g.is_empty())?;
        let stream = self.log_stream.as_deref().filter(|s| !s.is_empty())?;
        Some((group, stream))
    }
}

/// Comment body plus its idempotency token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusComment {
    pub content: String,
    pub client_request_token: String,
}

impl StatusComment {
    pub fn compose(context: &BuildReviewContext, log_excerpt: Option<&str>) -> Self {
        let (badge, prose) = context.status.presentation();

        let mut content = format!(
            "{}\n\nBuild `{}` for project `{}` {prose}",
            badge.markdown(&context.region),
            context.build_uuid,
            context.project_name,
        );
        content.push_str(&format!(
            "Visit the [AWS CodeBuild console]({}) to view the build details.",
            context.console_url()
        ));
        if let Some(excerpt) = log_excerpt {
            content.push_str(&format!("\n```\n{excerpt}\n```\n"));
        }

        Self {
            content,
            client_request_token: request_token(&context.build_arn, &context.status),
        }
    }
}

/// Idempotency token for a build reaching a status.
pub fn request_token(build_arn: &str, status: &BuildStatus) -> String {
    format!("{build_arn}{}", status.as_str())
}

/// Result of a status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    NotPullRequestBuild,
    Posted {
        status: BuildStatus,
        comment: StatusComment,
    },
}

/// Posts build status comments on pull requests.
#[derive(Clone)]
pub struct StatusReporter {
    comments: Arc<dyn CommentPoster>,
    logs: Arc<dyn LogReader>,
}

impl StatusReporter {
    pub fn new(comments: Arc<dyn CommentPoster>, logs: Arc<dyn LogReader>) -> Self {
        Self { comments, logs }
    }

    pub async fn report(&self, region: Option<&str>, detail: &BuildStateChange) -> Result<Report> {
        let Some(context) = BuildReviewContext::from_event(region, detail)? else {
            tracing::info!(
                build_arn = detail.build_id.as_deref().unwrap_or_default(),
                "Not a pull-request build"
            );
            return Ok(Report::NotPullRequestBuild);
        };
        let repository_name = context.repository_name().ok_or_else(|| {
            EventError::MissingField("detail.additional-information.source.location".to_string())
        })?;

        let excerpt = self.log_excerpt(&context).await;
        let comment = StatusComment::compose(&context, excerpt.as_deref());
        let pull_request = &context.pull_request;

        let request = PostCommentRequest {
            repository_name: repository_name.to_string(),
            pull_request_id: pull_request.id.clone(),
            before_commit_id: pull_request.destination_commit.clone(),
            after_commit_id: pull_request.source_commit.clone(),
            content: comment.content.clone(),
            client_request_token: comment.client_request_token.clone(),
        };

        tracing::info!("Posting comment:\n{}", comment.content);
        tracing::debug!(params = ?request, "PostComment params");
        self.comments
            .post_comment(request)
            .await
            .map_err(FlowError::PostComment)?;
        tracing::info!("PostComment succeeded!");

        Ok(Report::Posted {
            status: context.status,
            comment,
        })
    }

    /// Tail of the build log for failed builds. A failed fetch is logged and
    /// yields no excerpt.
    async fn log_excerpt(&self, context: &BuildReviewContext) -> Option<String> {
        if !context.status.wants_log_excerpt() {
            return None;
        }
        let (group, stream) = context.log_stream_ref()?;
        let query = LogQuery::tail(group, stream);

        tracing::info!("Sending request for CloudWatch Log events...");
        tracing::debug!(params = ?query, "GetLogEvents params");
        match self.logs.get_log_events(query).await {
            Ok(events) => {
                tracing::info!(count = events.len(), "CloudWatch Log request succeeded!");
                Some(events.into_iter().map(|event| event.message).collect())
            }
            Err(e) => {
                tracing::error!(error = %e, "GetLogEvents failed, posting comment without logs");
                None
            }
        }
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> std::result::Result<&'a str, EventError> {
    value.ok_or_else(|| EventError::MissingField(format!("detail.{field}")))
}

fn last_segment(value: &str, separator: char) -> &str {
    value.rsplit(separator).next().unwrap_or(value)
}

/// Percent-encode a build id for the console URL.
///
/// Letters, digits, `_.-~` and `~@#$&()*!+=:;,.?/'` pass through unchanged.
pub fn encode_build_id(value: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    const SAFE: &[u8] = b"_.-~@#$&()*!+=:;,?/'";

    let mut encoded = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        if byte.is_ascii_alphanumeric() || SAFE.contains(byte) {
            encoded.push(*byte as char);
        } else {
            encoded.push('%');
            encoded.push(HEX[(byte >> 4) as usize] as char);
            encoded.push(HEX[(byte & 0x0F) as usize] as char);
        }
    }
    encoded
}
