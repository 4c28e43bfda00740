//! Event classification predicates.
//!
//! Each predicate answers whether an envelope is one specific kind of event.
//! Predicates never fail: a missing or mistyped field is logged at error
//! level and the predicate answers `false`.

use super::{EventEnvelope, EventError};

pub const CODEBUILD_SOURCE: &str = "aws.codebuild";
pub const CODECOMMIT_SOURCE: &str = "aws.codecommit";
pub const SCHEDULE_SOURCE: &str = "aws.events";

pub const BUILD_STATE_CHANGE: &str = "CodeBuild Build State Change";
pub const PULL_REQUEST_STATE_CHANGE: &str = "CodeCommit Pull Request State Change";
pub const REPOSITORY_STATE_CHANGE: &str = "CodeCommit Repository State Change";
pub const SCHEDULED_EVENT: &str = "Scheduled Event";

const PULL_REQUEST_EVENTS: [&str; 2] = ["pullRequestCreated", "pullRequestSourceBranchUpdated"];
const BRANCH_EVENTS: [&str; 1] = ["referenceUpdated"];
const TAG_EVENTS: [&str; 2] = ["referenceCreated", "referenceUpdated"];

/// A build changed state.
pub fn is_build_review_event(envelope: &EventEnvelope) -> bool {
    evaluate("build_review", || {
        let source = envelope.require("source")?;
        let detail_type = envelope.require("detail-type")?;

        Ok(source == CODEBUILD_SOURCE && detail_type == BUILD_STATE_CHANGE)
    })
}

/// A pull request was opened or its source branch moved.
pub fn is_pull_request_event(envelope: &EventEnvelope) -> bool {
    evaluate("pull_request", || {
        let source = envelope.require("source")?;
        let detail_type = envelope.require("detail-type")?;
        let event = envelope.require_detail("event")?;

        Ok(source == CODECOMMIT_SOURCE
            && detail_type == PULL_REQUEST_STATE_CHANGE
            && PULL_REQUEST_EVENTS.contains(&event))
    })
}

/// A branch reference was updated.
pub fn is_branch_event(envelope: &EventEnvelope) -> bool {
    is_reference_event(envelope, "branch", &BRANCH_EVENTS)
}

/// A tag reference was created or updated.
pub fn is_tag_event(envelope: &EventEnvelope) -> bool {
    is_reference_event(envelope, "tag", &TAG_EVENTS)
}

/// A scheduled tick fired.
pub fn is_schedule_event(envelope: &EventEnvelope) -> bool {
    evaluate("schedule", || {
        let source = envelope.require("source")?;
        let detail_type = envelope.require("detail-type")?;

        Ok(source == SCHEDULE_SOURCE && detail_type == SCHEDULED_EVENT)
    })
}

fn is_reference_event(envelope: &EventEnvelope, reference_type: &str, events: &[&str]) -> bool {
    evaluate(reference_type, || {
        let source = envelope.require("source")?;
        let detail_type = envelope.require("detail-type")?;
        let event = envelope.require_detail("event")?;
        let actual_type = envelope.require_detail("referenceType")?;

        Ok(source == CODECOMMIT_SOURCE
            && detail_type == REPOSITORY_STATE_CHANGE
            && events.contains(&event)
            && actual_type == reference_type)
    })
}

fn evaluate(predicate: &str, check: impl FnOnce() -> Result<bool, EventError>) -> bool {
    match check() {
        Ok(matched) => matched,
        Err(e) => {
            tracing::error!(predicate, error = %e, "Caught error while classifying event");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn envelope(value: Value) -> EventEnvelope {
        EventEnvelope::from_value(value).unwrap()
    }

    fn pull_request(event: &str) -> EventEnvelope {
        envelope(json!({
            "source": "aws.codecommit",
            "detail-type": "CodeCommit Pull Request State Change",
            "detail": { "event": event }
        }))
    }

    fn reference(event: &str, reference_type: &str) -> EventEnvelope {
        envelope(json!({
            "source": "aws.codecommit",
            "detail-type": "CodeCommit Repository State Change",
            "detail": { "event": event, "referenceType": reference_type }
        }))
    }

    #[test]
    fn build_review_requires_codebuild_source_and_detail_type() {
        assert!(is_build_review_event(&envelope(json!({
            "source": "aws.codebuild",
            "detail-type": "CodeBuild Build State Change",
        }))));
        assert!(!is_build_review_event(&envelope(json!({
            "source": "aws.codebuild",
            "detail-type": "CodeBuild Build Phase Change",
        }))));
        assert!(!is_build_review_event(&envelope(json!({
            "detail-type": "CodeBuild Build State Change",
        }))));
    }

    #[test]
    fn pull_request_accepts_exactly_created_and_source_branch_updated() {
        assert!(is_pull_request_event(&pull_request("pullRequestCreated")));
        assert!(is_pull_request_event(&pull_request("pullRequestSourceBranchUpdated")));

        for other in [
            "pullRequestStatusChanged",
            "pullRequestMergeStatusUpdated",
            "commentOnPullRequestCreated",
            "pullRequestApprovalStateChanged",
            "PullRequestCreated",
            " pullRequestCreated",
            "",
        ] {
            assert!(!is_pull_request_event(&pull_request(other)), "{other:?}");
        }
    }

    #[test]
    fn pull_request_without_detail_does_not_match() {
        assert!(!is_pull_request_event(&envelope(json!({
            "source": "aws.codecommit",
            "detail-type": "CodeCommit Pull Request State Change",
        }))));
    }

    #[test]
    fn branch_matches_only_updated_branch_references() {
        assert!(is_branch_event(&reference("referenceUpdated", "branch")));
        assert!(!is_branch_event(&reference("referenceCreated", "branch")));
        assert!(!is_branch_event(&reference("referenceDeleted", "branch")));
        assert!(!is_branch_event(&reference("referenceUpdated", "tag")));
    }

    #[test]
    fn tag_matches_created_and_updated_tag_references() {
        assert!(is_tag_event(&reference("referenceCreated", "tag")));
        assert!(is_tag_event(&reference("referenceUpdated", "tag")));
        assert!(!is_tag_event(&reference("referenceDeleted", "tag")));
        assert!(!is_tag_event(&reference("referenceCreated", "branch")));
    }

    #[test]
    fn reference_without_reference_type_does_not_match() {
        let event = envelope(json!({
            "source": "aws.codecommit",
            "detail-type": "CodeCommit Repository State Change",
            "detail": { "event": "referenceUpdated" }
        }));

        assert!(!is_branch_event(&event));
        assert!(!is_tag_event(&event));
    }

    #[test]
    fn schedule_requires_events_source() {
        assert!(is_schedule_event(&envelope(json!({
            "source": "aws.events",
            "detail-type": "Scheduled Event",
            "detail": {}
        }))));
        assert!(!is_schedule_event(&envelope(json!({
            "source": "aws.codecommit",
            "detail-type": "Scheduled Event",
        }))));
    }
}
