//! Entry points that route one event to its handler.
//!
//! There are four entry points, one per event rule on the bus. Each tries
//! its own predicates in order and hands the event to the first match:
//!
//! | entry    | predicates                    | handler                      |
//! |----------|-------------------------------|------------------------------|
//! | review   | build review, pull request    | status report / start build  |
//! | branch   | branch                        | start build                  |
//! | tag      | tag                           | start build                  |
//! | schedule | schedule                      | start build                  |
//!
//! An event no predicate accepts is logged and dropped. A handler error is
//! logged at critical severity and returned so the invocation fails.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collaborators::{BuildRunner, CommentPoster, LogReader};
use crate::error::Result;
use crate::events::{predicates, Event, EventEnvelope, EventKind};
use crate::reporter::{Report, StatusReporter};
use crate::trigger::BuildTrigger;

/// One of the four invocation entry points.
/// Names are matched case-insensitively, both on the command line and in
/// deserialized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum EntryPoint {
    Review,
    Branch,
    Tag,
    Schedule,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 4] = [Self::Review, Self::Branch, Self::Tag, Self::Schedule];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Branch => "branch",
            Self::Tag => "tag",
            Self::Schedule => "schedule",
        }
    }
}

impl FromStr for EntryPoint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "review" => Ok(Self::Review),
            "branch" => Ok(Self::Branch),
            "tag" => Ok(Self::Tag),
            "schedule" => Ok(Self::Schedule),
            other => Err(format!("unknown entry point: {other}")),
        }
    }
}

impl TryFrom<String> for EntryPoint {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    BuildStarted { kind: String, build_arn: String },
    CommentPosted {
        build_status: String,
        client_request_token: String,
    },
    NotPullRequestBuild,
    Ignored,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BuildStarted { .. } => "build_started",
            Self::CommentPosted { .. } => "comment_posted",
            Self::NotPullRequestBuild => "not_pull_request_build",
            Self::Ignored => "ignored",
        }
    }
}

/// Routes events from the entry points to the trigger and reporter.
#[derive(Clone)]
pub struct Dispatcher {
    trigger: BuildTrigger,
    reporter: StatusReporter,
}

impl Dispatcher {
    pub fn new(
        project_name: impl Into<String>,
        runner: Arc<dyn BuildRunner>,
        comments: Arc<dyn CommentPoster>,
        logs: Arc<dyn LogReader>,
    ) -> Self {
        Self {
            trigger: BuildTrigger::new(project_name, runner),
            reporter: StatusReporter::new(comments, logs),
        }
    }

    pub fn project_name(&self) -> &str {
        self.trigger.project_name()
    }

    pub async fn dispatch(&self, entry: EntryPoint, envelope: &EventEnvelope) -> Result<Outcome> {
        match entry {
            EntryPoint::Review => self.review(envelope).await,
            EntryPoint::Branch => self.branch(envelope).await,
            EntryPoint::Tag => self.tag(envelope).await,
            EntryPoint::Schedule => self.schedule(envelope).await,
        }
    }

    /// Build state changes and pull request updates.
    pub async fn review(&self, envelope: &EventEnvelope) -> Result<Outcome> {
        log_received(EntryPoint::Review, envelope);

        let kind = if predicates::is_build_review_event(envelope) {
            tracing::info!("Handling valid CodeBuild review event...");
            EventKind::BuildStateChange
        } else if predicates::is_pull_request_event(envelope) {
            tracing::info!("Handling valid pull request review event...");
            EventKind::PullRequestCreatedOrUpdated
        } else {
            tracing::info!("Not a reviewable pull request or CodeBuild event");
            EventKind::Unrecognized
        };

        guard(EntryPoint::Review, self.handle(kind, envelope).await)
    }

    pub async fn branch(&self, envelope: &EventEnvelope) -> Result<Outcome> {
        log_received(EntryPoint::Branch, envelope);

        let kind = if predicates::is_branch_event(envelope) {
            tracing::info!("Handling valid CodeCommit branch event...");
            EventKind::BranchReferenceUpdated
        } else {
            tracing::info!("Not a CodeCommit branch event");
            EventKind::Unrecognized
        };

        guard(EntryPoint::Branch, self.handle(kind, envelope).await)
    }

    pub async fn tag(&self, envelope: &EventEnvelope) -> Result<Outcome> {
        log_received(EntryPoint::Tag, envelope);

        let kind = if predicates::is_tag_event(envelope) {
            tracing::info!("Handling valid CodeCommit tag event...");
            EventKind::TagReferenceCreatedOrUpdated
        } else {
            tracing::info!("Not a CodeCommit tag event");
            EventKind::Unrecognized
        };

        guard(EntryPoint::Tag, self.handle(kind, envelope).await)
    }

    pub async fn schedule(&self, envelope: &EventEnvelope) -> Result<Outcome> {
        log_received(EntryPoint::Schedule, envelope);

        let kind = if predicates::is_schedule_event(envelope) {
            tracing::info!("Handling valid CloudWatch schedule event...");
            EventKind::ScheduledTick
        } else {
            tracing::info!("Not a CloudWatch schedule event");
            EventKind::Unrecognized
        };

        guard(EntryPoint::Schedule, self.handle(kind, envelope).await)
    }

    async fn handle(&self, kind: EventKind, envelope: &EventEnvelope) -> Result<Outcome> {
        let started = match Event::parse_as(kind, envelope)? {
            Event::BuildStateChange { region, detail } => {
                return Ok(match self.reporter.report(region.as_deref(), &detail).await? {
                    Report::NotPullRequestBuild => Outcome::NotPullRequestBuild,
                    Report::Posted { status, comment } => Outcome::CommentPosted {
                        build_status: status.to_string(),
                        client_request_token: comment.client_request_token,
                    },
                });
            }
            Event::PullRequest(change) => self.trigger.pull_request(&change).await?,
            Event::Branch(change) | Event::Tag(change) => self.trigger.reference(&change).await?,
            Event::Schedule(tick) => self.trigger.schedule(&tick).await?,
            Event::Unrecognized => return Ok(Outcome::Ignored),
        };

        Ok(Outcome::BuildStarted {
            kind: kind.to_string(),
            build_arn: started.arn,
        })
    }
}

fn log_received(entry: EntryPoint, envelope: &EventEnvelope) {
    tracing::info!(entry = %entry, "Received event:\n{}", envelope.to_pretty_json());
}

fn guard(entry: EntryPoint, result: Result<Outcome>) -> Result<Outcome> {
    if let Err(e) = &result {
        tracing::error!(severity = "critical", entry = %entry, error = %e, "Caught error: {e}");
    }
    result
}
