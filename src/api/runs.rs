use super::{ApiError, SharedState, TriggerRequest};
use crate::model::RunId;
use crate::pipeline::RunState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub run_id: RunId,
    pub status: RunState,
}

pub async fn trigger_run(
    State(state): State<SharedState>,
    Json(req): Json<TriggerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = req
        .prepare(
            state.tracker.as_ref(),
            state.planner.as_ref(),
            &state.default_base_branch,
        )
        .await?;

    let handle = state.runtime.start(input.run_id(), input).await?;
    if handle.attached {
        info!("Trigger attached to existing run {}", handle.run_id);
    } else {
        info!("Triggered {}", handle.run_id);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            run_id: handle.run_id,
            status: handle.state,
        }),
    ))
}

pub async fn list_runs(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.runtime.list().await?))
}

pub async fn get_run(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.runtime.query(&RunId::from(id)).await?;
    Ok(Json(status))
}

pub async fn cancel_run(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let run_id = RunId::from(id);
    state.runtime.cancel(&run_id).await?;
    info!("Cancellation requested for {}", run_id);
    Ok(Json(state.runtime.query(&run_id).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::{router, AppState};
    use crate::testutil::{FakePlanner, FakeRuntime, FakeTracker};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router() -> (Router, Arc<FakeRuntime>) {
        let runtime = Arc::new(FakeRuntime::default());
        let state = Arc::new(AppState {
            runtime: runtime.clone(),
            planner: Arc::new(FakePlanner::default()),
            tracker: Arc::new(FakeTracker::default()),
            default_base_branch: "main".to_string(),
        });
        (router(state), runtime)
    }

    fn trigger(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/runs")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_router();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_trigger_starts_run() {
        let (app, runtime) = test_router();
        let resp = app
            .oneshot(trigger(serde_json::json!({
                "ticket_id": "PROJ-1",
                "repo_owner": "org",
                "repo_name": "app",
                "base_branch": "main"
            })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body = json_body(resp).await;
        assert_eq!(body["run_id"], "implementation-PROJ-1-app");
        assert_eq!(body["status"], "pending");
        assert_eq!(runtime.started_tickets(), vec!["PROJ-1"]);
    }

    #[tokio::test]
    async fn test_trigger_without_ticket_is_bad_request() {
        let (app, runtime) = test_router();
        let resp = app
            .oneshot(trigger(serde_json::json!({
                "ticket_id": "",
                "repo_owner": "org",
                "repo_name": "app"
            })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["error"], "ticket_id is required");
        assert!(runtime.started_tickets().is_empty());
    }

    #[tokio::test]
    async fn test_trigger_rejects_absolute_owner() {
        let (app, runtime) = test_router();
        let resp = app
            .oneshot(trigger(serde_json::json!({
                "ticket_id": "PROJ-1",
                "repo_owner": "/tmp/x",
                "repo_name": "app"
            })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid repo_owner '/tmp/x'"));
        assert!(runtime.started_tickets().is_empty());
    }

    #[tokio::test]
    async fn test_status_and_cancel() {
        let (app, _) = test_router();
        let resp = app
            .clone()
            .oneshot(trigger(serde_json::json!({
                "ticket_id": "PROJ-2",
                "repo_owner": "org",
                "repo_name": "app"
            })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let req = Request::builder()
            .uri("/api/v1/runs/implementation-PROJ-2-app")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["ticket_id"], "PROJ-2");
        assert_eq!(body["state"], "pending");

        let req = Request::builder()
            .method("DELETE")
            .uri("/api/v1/runs/implementation-PROJ-2-app")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["state"], "cancelled");

        let req = Request::builder().uri("/api/v1/runs").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let body = json_body(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_run_is_not_found() {
        let (app, _) = test_router();
        let req = Request::builder()
            .uri("/api/v1/runs/implementation-NOPE-1-app")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = json_body(resp).await;
        assert_eq!(body["error"], "Run implementation-NOPE-1-app not found");
    }
}
