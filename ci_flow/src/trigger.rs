//! Start-build requests for pull requests, references and schedules.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collaborators::{BuildRunner, StartedBuild};
use crate::error::{FlowError, Result};
use crate::events::{PullRequestChange, ReferenceChange, ReferenceType, ScheduledTick};
use crate::params::{self, OverrideVariable, PullRequestRef};

/// Normalized request to start the configured build job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStartRequest {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_version: Option<String>,
    #[serde(
        rename = "environmentVariablesOverride",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub overrides: Vec<OverrideVariable>,
}

impl BuildStartRequest {
    pub fn new(
        project_name: impl Into<String>,
        source_version: Option<String>,
        overrides: Vec<OverrideVariable>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            source_version,
            overrides,
        }
    }

    /// Build the pull request's source commit, tagged with the pull request identity.
    pub fn for_pull_request(project_name: &str, change: &PullRequestChange) -> Self {
        let pull_request = PullRequestRef {
            id: change.pull_request_id.clone(),
            source_commit: change.source_commit.clone(),
            destination_commit: change.destination_commit.clone(),
        };
        Self::new(
            project_name,
            Some(change.source_commit.clone()),
            pull_request.to_variables(),
        )
    }

    /// Build the reference's commit, naming the branch or tag.
    pub fn for_reference(project_name: &str, change: &ReferenceChange) -> Self {
        let overrides = match change.reference_type {
            ReferenceType::Branch => vec![OverrideVariable::plaintext(params::BRANCH, &change.reference_name)],
            ReferenceType::Tag => vec![OverrideVariable::plaintext(params::TAG, &change.reference_name)],
            ReferenceType::Unknown => Vec::new(),
        };
        Self::new(project_name, Some(change.commit_id.clone()), overrides)
    }

    /// Build the default source version, stamped with the tick time.
    pub fn for_schedule(project_name: &str, tick: &ScheduledTick) -> Self {
        Self::new(
            project_name,
            None,
            vec![OverrideVariable::plaintext(params::SCHEDULE, &tick.time)],
        )
    }
}

/// Starts builds of one job through the build runner.
#[derive(Clone)]
pub struct BuildTrigger {
    project_name: String,
    runner: Arc<dyn BuildRunner>,
}

impl BuildTrigger {
    pub fn new(project_name: impl Into<String>, runner: Arc<dyn BuildRunner>) -> Self {
        Self {
            project_name: project_name.into(),
            runner,
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub async fn pull_request(&self, change: &PullRequestChange) -> Result<StartedBuild> {
        self.start(BuildStartRequest::for_pull_request(&self.project_name, change))
            .await
    }

    pub async fn reference(&self, change: &ReferenceChange) -> Result<StartedBuild> {
        self.start(BuildStartRequest::for_reference(&self.project_name, change))
            .await
    }

    pub async fn schedule(&self, tick: &ScheduledTick) -> Result<StartedBuild> {
        self.start(BuildStartRequest::for_schedule(&self.project_name, tick))
            .await
    }

    /// Send one start request. Errors are returned unchanged, without retry.
    pub async fn start(&self, request: BuildStartRequest) -> Result<StartedBuild> {
        tracing::info!("Sending request to StartBuild...");
        tracing::debug!(params = ?request, "StartBuild params");

        let started = self
            .runner
            .start_build(request)
            .await
            .map_err(FlowError::StartBuild)?;

        tracing::info!(build_arn = %started.arn, "StartBuild succeeded!");
        tracing::debug!(response = ?started, "StartBuild response");
        Ok(started)
    }
}
