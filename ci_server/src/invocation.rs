//! One entry point invocation, shared by the HTTP and CLI surfaces.

use std::time::Instant;

use tracing::Instrument;

use ci_flow::{Dispatcher, EntryPoint, EventEnvelope, FlowError, Outcome};

use crate::metrics;

/// Dispatch `envelope` to `entry` inside a span tagged with a fresh
/// invocation id, recording metrics for the result.
pub async fn invoke(
    dispatcher: &Dispatcher,
    entry: EntryPoint,
    envelope: &EventEnvelope,
) -> Result<Outcome, FlowError> {
    let invocation_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("invocation", %invocation_id, entry = %entry);

    metrics::event_received(entry);
    let started = Instant::now();
    let result = dispatcher.dispatch(entry, envelope).instrument(span).await;
    metrics::invocation_duration(entry, started.elapsed().as_millis() as u64);

    match &result {
        Ok(outcome) => {
            metrics::outcome(entry, outcome.label());
            match outcome {
                Outcome::BuildStarted { kind, .. } => metrics::build_started(kind),
                Outcome::CommentPosted { build_status, .. } => metrics::comment_posted(build_status),
                Outcome::NotPullRequestBuild | Outcome::Ignored => {}
            }
        }
        Err(e) => metrics::invocation_failed(entry, e.label()),
    }
    result
}
