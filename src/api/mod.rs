pub mod jobs;
pub mod server;
pub mod webhooks;

use std::sync::Arc;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;

use crate::state::AppState;

/// Error body of every REST endpoint / 错误响应
#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!("Request rejected with {}: {}", status.as_u16(), self);
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// REST routes; layers are added by the caller
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(server::index))
        .route("/health", get(server::health_check))
        .route("/jobs/search", get(jobs::search_jobs_get).post(jobs::search_jobs_post))
        .route("/jobs/trending", get(jobs::trending_jobs))
        .route("/webhooks/register", post(webhooks::register_webhook))
        .route("/webhooks", get(webhooks::list_webhooks))
        .route("/webhooks/:id", delete(webhooks::delete_webhook))
        .with_state(state)
}
