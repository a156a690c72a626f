use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::pipeline::{CorpusPipeline, PipelineError};

mod sessions;

pub use sessions::SessionRegistry;

/// Largest accepted upload request.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const MAX_CONCURRENT_REQUESTS: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pipeline: CorpusPipeline,
    sessions: Arc<SessionRegistry>,
}

#[derive(Serialize)]
pub struct ApiResponse {
    status: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Invalid upload: {0}")]
    Upload(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(PipelineError::UnknownDocument(_)) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, Json(ApiResponse { status: self.to_string() })).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Create and configure the API router
pub fn create_api(pipeline: CorpusPipeline, session_capacity: usize) -> Router {
    let state = AppState {
        pipeline,
        sessions: Arc::new(SessionRegistry::new(session_capacity)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_check))
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/:id", get(sessions::get_session))
        .route("/sessions/:id/documents", post(sessions::upload_documents))
        .route("/sessions/:id/question", put(sessions::set_question))
        .route("/sessions/:id/ask", post(sessions::ask))
        .route("/sessions/:id/suggestions/:index", post(sessions::select_suggestion))
        .route("/sessions/:id/reset", post(sessions::reset_session))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string(),
    })
}
