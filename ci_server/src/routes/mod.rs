//! Controller HTTP routes: one POST per entry point, plus health.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use ci_flow::{Dispatcher, EntryPoint, EventEnvelope, FlowError};

use crate::invocation;

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the controller's Axum router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events/{entry}", post(event_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "project": state.dispatcher.project_name(),
    }))
}

async fn event_handler(
    State(state): State<AppState>,
    Path(entry): Path<EntryPoint>,
    Json(body): Json<Value>,
) -> Response {
    let envelope = match EventEnvelope::from_value(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_event", "message": e.to_string() })),
            )
                .into_response();
        }
    };

    match invocation::invoke(&state.dispatcher, entry, &envelope).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => flow_error_response(&e),
    }
}

fn flow_error_response(e: &FlowError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.label(), "message": e.to_string() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use ci_flow::{
        BuildRunner, BuildStartRequest, CollaboratorError, CommentPoster, LogEvent, LogQuery,
        LogReader, PostCommentRequest, StartedBuild,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Runner {
        requests: Mutex<Vec<BuildStartRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl BuildRunner for Runner {
        async fn start_build(&self, request: BuildStartRequest) -> Result<StartedBuild, CollaboratorError> {
            self.requests.lock().unwrap().push(request);
            if self.fail {
                return Err(CollaboratorError::Transport("connection refused".into()));
            }
            Ok(StartedBuild {
                arn: "arn:aws:codebuild:us-east-1:1:build/app-ci:1".into(),
                id: "app-ci:1".into(),
            })
        }
    }

    struct Silent;

    #[async_trait]
    impl CommentPoster for Silent {
        async fn post_comment(&self, _request: PostCommentRequest) -> Result<(), CollaboratorError> {
            Ok(())
        }
    }

    #[async_trait]
    impl LogReader for Silent {
        async fn get_log_events(&self, _query: LogQuery) -> Result<Vec<LogEvent>, CollaboratorError> {
            Ok(Vec::new())
        }
    }

    fn app(runner: Arc<Runner>) -> Router {
        let dispatcher = Dispatcher::new("app-ci", runner, Arc::new(Silent), Arc::new(Silent));
        router(AppState {
            dispatcher: Arc::new(dispatcher),
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn tag_event() -> Value {
        json!({
            "source": "aws.codecommit",
            "detail-type": "CodeCommit Repository State Change",
            "region": "us-east-1",
            "detail": {
                "event": "referenceCreated",
                "referenceType": "tag",
                "referenceName": "v1.0.0",
                "commitId": "abc123"
            }
        })
    }

    #[tokio::test]
    async fn health_reports_project() {
        let response = app(Arc::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok", "project": "app-ci" }));
    }

    #[tokio::test]
    async fn tag_event_starts_build() {
        let runner = Arc::new(Runner::default());
        let response = app(runner.clone())
            .oneshot(post_json("/events/tag", tag_event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["outcome"], "build_started");
        assert_eq!(body["build_arn"], "arn:aws:codebuild:us-east-1:1:build/app-ci:1");

        let requests = runner.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].source_version.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn entry_point_in_path_is_case_insensitive() {
        let runner = Arc::new(Runner::default());
        let response = app(runner.clone())
            .oneshot(post_json("/events/TAG", tag_event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["outcome"], "build_started");
        assert_eq!(runner.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn event_for_another_entry_is_ignored() {
        let runner = Arc::new(Runner::default());
        let response = app(runner.clone())
            .oneshot(post_json("/events/schedule", tag_event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "outcome": "ignored" }));
        assert!(runner.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_object_body_is_rejected() {
        let response = app(Arc::default())
            .oneshot(post_json("/events/review", json!([1, 2, 3])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid_event");
    }

    #[tokio::test]
    async fn unknown_entry_point_is_rejected() {
        let response = app(Arc::default())
            .oneshot(post_json("/events/deploy", tag_event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn runner_failure_is_a_server_error() {
        let runner = Arc::new(Runner {
            fail: true,
            ..Runner::default()
        });
        let response = app(runner)
            .oneshot(post_json("/events/tag", tag_event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "start_build");
    }
}
