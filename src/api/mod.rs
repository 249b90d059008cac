mod runs;
mod trigger;

pub use trigger::TriggerRequest;

use crate::error::{RuntimeError, TriggerError};
use crate::planner::PlanSource;
use crate::runtime::ExecutionRuntime;
use crate::tracker::Tracker;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

pub struct AppState {
    pub runtime: Arc<dyn ExecutionRuntime>,
    pub planner: Arc<dyn PlanSource>,
    pub tracker: Arc<dyn Tracker>,
    pub default_base_branch: String,
}

pub type SharedState = Arc<AppState>;

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<RuntimeError> for ApiError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::NotFound(id) => ApiError::NotFound(format!("Run {} not found", id)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TriggerError> for ApiError {
    fn from(e: TriggerError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/runs", get(runs::list_runs).post(runs::trigger_run))
        .route(
            "/api/v1/runs/{id}",
            get(runs::get_run).delete(runs::cancel_run),
        )
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
