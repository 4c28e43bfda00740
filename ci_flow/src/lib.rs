//! Codeflow CI event engine.
//!
//! Classifies source-control and build events, starts build jobs for pull
//! requests, branches, tags and schedules, and reports build status back to
//! the pull request that triggered the build.
//!
//! All external services are reached through the traits in
//! [`collaborators`]; the engine itself performs no I/O.

pub mod collaborators;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod params;
pub mod reporter;
pub mod trigger;

pub use collaborators::{
    BuildRunner, CollaboratorError, CommentPoster, LogEvent, LogQuery, LogReader,
    PostCommentRequest, StartedBuild,
};
pub use dispatcher::{Dispatcher, EntryPoint, Outcome};
pub use error::FlowError;
pub use events::{Event, EventEnvelope, EventError, EventKind};
pub use params::{OverrideVariable, PullRequestRef, VariableKind};
pub use reporter::{BuildReviewContext, BuildStatus, StatusComment, StatusReporter};
pub use trigger::{BuildStartRequest, BuildTrigger};
