//! HTTP front end: submit goals and poll their status.

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskpilot_agent::{Orchestrator, Status, StatusError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub fn router(orchestrator: Orchestrator) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/new", post(new_goal))
        .route("/status/{id}", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

/// Serves `app` until `signal` resolves, then gives open connections `grace`
/// to finish before dropping them.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    signal: impl Future<Output = ()> + Send + 'static,
    grace: Duration,
) -> eyre::Result<()> {
    let (signalled, deadline) = oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            let _ = signalled.send(());
        })
        .into_future();
    let deadline = async move {
        match deadline.await {
            Ok(()) => tokio::time::sleep(grace).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        result = server => result?,
        () = deadline => {
            tracing::warn!(grace = ?grace, "shutdown deadline passed, dropping open connections");
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unable to parse body")]
    Body,
    #[error("unable to parse id")]
    Id,
    #[error(transparent)]
    Status(#[from] StatusError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match &self {
            ApiError::Body | ApiError::Id => StatusCode::BAD_REQUEST,
            ApiError::Status(StatusError::NotFound(..)) => StatusCode::NOT_FOUND,
            ApiError::Status(..) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (code, Json(body)).into_response()
    }
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct NewGoal {
    pub goal: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewGoalResponse {
    pub id: Uuid,
}

/// POST /new - starts a goal and returns its request id.
async fn new_goal(
    State(orchestrator): State<Orchestrator>,
    body: Result<Json<NewGoal>, JsonRejection>,
) -> Result<Json<NewGoalResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected goal body");
        ApiError::Body
    })?;
    let id = orchestrator.submit(body.goal).await;
    Ok(Json(NewGoalResponse { id }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: Status,
}

/// GET /status/{id} - the planner's current snapshot.
async fn status(
    State(orchestrator): State<Orchestrator>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::Id)?;
    let status = orchestrator.query_status(id).await.inspect_err(|error| {
        tracing::warn!(request_id = %id, error = %error, "status query failed");
    })?;
    Ok(Json(StatusResponse { status }))
}
