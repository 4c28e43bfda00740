//! CodeBuild, CodeCommit and CloudWatch Logs clients behind the engine's
//! collaborator traits.

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::Deserialize;

use ci_flow::{
    BuildRunner, BuildStartRequest, CollaboratorError, CommentPoster, LogEvent, LogQuery,
    LogReader, PostCommentRequest, StartedBuild,
};

use super::AwsJsonClient;
use crate::config::AwsConfig;

pub struct CodeBuildClient {
    client: AwsJsonClient,
}

pub struct CodeCommitClient {
    client: AwsJsonClient,
}

pub struct CloudWatchLogsClient {
    client: AwsJsonClient,
}

impl CodeBuildClient {
    pub fn new(http: reqwest::Client, config: &AwsConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: AwsJsonClient::new(
                http,
                &config.codebuild_endpoint,
                &config.region,
                "codebuild",
                "CodeBuild_20161006",
                config.credentials.clone(),
            )?,
        })
    }
}

impl CodeCommitClient {
    pub fn new(http: reqwest::Client, config: &AwsConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: AwsJsonClient::new(
                http,
                &config.codecommit_endpoint,
                &config.region,
                "codecommit",
                "CodeCommit_20150413",
                config.credentials.clone(),
            )?,
        })
    }
}

impl CloudWatchLogsClient {
    pub fn new(http: reqwest::Client, config: &AwsConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: AwsJsonClient::new(
                http,
                &config.logs_endpoint,
                &config.region,
                "logs",
                "Logs_20140328",
                config.credentials.clone(),
            )?,
        })
    }
}

#[derive(Deserialize)]
struct StartBuildOutput {
    build: StartedBuild,
}

#[derive(Deserialize)]
struct GetLogEventsOutput {
    #[serde(default)]
    events: Vec<LogEvent>,
}

#[async_trait]
impl BuildRunner for CodeBuildClient {
    async fn start_build(&self, request: BuildStartRequest) -> Result<StartedBuild, CollaboratorError> {
        let output: StartBuildOutput = self.client.call("StartBuild", &request).await?;
        tracing::debug!(build_id = %output.build.id, "CodeBuild accepted build");
        Ok(output.build)
    }
}

#[async_trait]
impl CommentPoster for CodeCommitClient {
    async fn post_comment(&self, request: PostCommentRequest) -> Result<(), CollaboratorError> {
        let _: IgnoredAny = self
            .client
            .call("PostCommentForPullRequest", &request)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LogReader for CloudWatchLogsClient {
    async fn get_log_events(&self, query: LogQuery) -> Result<Vec<LogEvent>, CollaboratorError> {
        let output: GetLogEventsOutput = self.client.call("GetLogEvents", &query).await?;
        Ok(output.events)
    }
}
