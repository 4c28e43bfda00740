//! Event envelope, classification and typed payloads.

pub mod detail;
pub mod envelope;
pub mod predicates;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use detail::{
    AdditionalInformation, BuildEnvironment, BuildLogs, BuildSource, BuildStateChange,
    PullRequestChange, ReferenceChange, ReferenceType, ScheduledTick,
};
pub use envelope::EventEnvelope;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("event is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("invalid {kind} detail: {source}")]
    InvalidDetail {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Classification of an envelope, decided by an entry point's predicates.
/// Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BuildStateChange,
    PullRequestCreatedOrUpdated,
    BranchReferenceUpdated,
    TagReferenceCreatedOrUpdated,
    ScheduledTick,
    Unrecognized,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildStateChange => "build_state_change",
            Self::PullRequestCreatedOrUpdated => "pull_request",
            Self::BranchReferenceUpdated => "branch",
            Self::TagReferenceCreatedOrUpdated => "tag",
            Self::ScheduledTick => "schedule",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified event with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BuildStateChange {
        region: Option<String>,
        detail: BuildStateChange,
    },
    PullRequest(PullRequestChange),
    Branch(ReferenceChange),
    Tag(ReferenceChange),
    Schedule(ScheduledTick),
    Unrecognized,
}

impl Event {
    /// Parse the payload of an envelope already classified as `kind`.
    pub fn parse_as(kind: EventKind, envelope: &EventEnvelope) -> Result<Self, EventError> {
        Ok(match kind {
            EventKind::BuildStateChange => Self::BuildStateChange {
                region: envelope.field("region").map(str::to_string),
                detail: parse_detail(kind, envelope)?,
            },
            EventKind::PullRequestCreatedOrUpdated => Self::PullRequest(parse_detail(kind, envelope)?),
            EventKind::BranchReferenceUpdated => Self::Branch(parse_detail(kind, envelope)?),
            EventKind::TagReferenceCreatedOrUpdated => Self::Tag(parse_detail(kind, envelope)?),
            EventKind::ScheduledTick => Self::Schedule(ScheduledTick {
                time: envelope.require("time")?.to_string(),
            }),
            EventKind::Unrecognized => Self::Unrecognized,
        })
    }
}

fn parse_detail<T: DeserializeOwned>(kind: EventKind, envelope: &EventEnvelope) -> Result<T, EventError> {
    let detail = envelope.require_detail_value()?;
    serde_json::from_value(detail.clone()).map_err(|source| EventError::InvalidDetail { kind, source })
}
