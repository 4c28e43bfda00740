//! Typed `detail` payloads, one per actionable event kind.

use serde::{Deserialize, Serialize};

use crate::params::OverrideVariable;
use crate::reporter::BuildStatus;

/// `CodeBuild Build State Change` detail.
///
/// Only the echoed environment is needed to tell whether the build belongs
/// to a pull request. The build identity fields are required later, by
/// [`BuildReviewContext::from_event`](crate::reporter::BuildReviewContext::from_event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildStateChange {
    /// Full build ARN, e.g. `arn:aws:codebuild:<region>:<account>:build/<project>:<uuid>`.
    #[serde(default)]
    pub build_id: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub build_status: Option<BuildStatus>,
    pub additional_information: AdditionalInformation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdditionalInformation {
    pub environment: BuildEnvironment,
    #[serde(default)]
    pub source: Option<BuildSource>,
    #[serde(default)]
    pub logs: Option<BuildLogs>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildEnvironment {
    /// Override variables echoed back from the start request.
    pub environment_variables: Vec<OverrideVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSource {
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildLogs {
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub stream_name: Option<String>,
}

/// `CodeCommit Pull Request State Change` detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestChange {
    pub event: String,
    pub pull_request_id: String,
    pub source_commit: String,
    pub destination_commit: String,
}

/// `CodeCommit Repository State Change` detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceChange {
    pub event: String,
    pub reference_type: ReferenceType,
    pub reference_name: String,
    pub commit_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Branch,
    Tag,
    #[serde(other)]
    Unknown,
}

/// Scheduled tick; only the firing time is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTick {
    pub time: String,
}
