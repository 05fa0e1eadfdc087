//! HTTP routes.
//!
//! Thin axum handlers over [`AppContext`]. Authentication is out of scope;
//! callers identify themselves with an explicit `user_id`.

pub mod agent;
pub mod meetings;
pub mod tasks;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use timewise_domain::TimewiseError;

use crate::context::AppContext;

/// Build the application router.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/agent/chat", post(agent::chat))
        .route("/meetings", post(meetings::create).get(meetings::list))
        .route(
            "/meetings/{id}",
            get(meetings::get_one).put(meetings::update).delete(meetings::remove),
        )
        .route("/tasks", post(tasks::create).get(tasks::list))
        .route("/tasks/{id}", get(tasks::get_one).put(tasks::update).delete(tasks::remove))
        .with_state(ctx)
}

/// Error wrapper that maps domain errors onto HTTP status codes.
pub struct ApiError(TimewiseError);

impl From<TimewiseError> for ApiError {
    fn from(err: TimewiseError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TimewiseError::NotFound(_) => StatusCode::NOT_FOUND,
            TimewiseError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TimewiseError::Network(_) | TimewiseError::Completion(_) => StatusCode::BAD_GATEWAY,
            TimewiseError::Database(_)
            | TimewiseError::Config(_)
            | TimewiseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}
