//! Task CRUD endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use timewise_core::ItemFilter;
use timewise_domain::{Task, TaskDraft, TaskPatch, TimewiseError};

use crate::context::AppContext;
use crate::routes::meetings::UserScope;
use crate::routes::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub user_id: i64,
    #[serde(flatten)]
    pub draft: TaskDraft,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub user_id: i64,
    #[serde(flatten)]
    pub patch: TaskPatch,
}

/// `POST /tasks`
pub async fn create(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = ctx.calendar.create_task(req.user_id, req.draft).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `GET /tasks?user_id=N`
pub async fn list(
    State(ctx): State<Arc<AppContext>>,
    Query(scope): Query<UserScope>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = ctx.calendar.find_tasks(scope.user_id, &ItemFilter::default()).await?;
    Ok(Json(tasks))
}

/// `GET /tasks/{id}?user_id=N`
pub async fn get_one(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Query(scope): Query<UserScope>,
) -> Result<Json<Task>, ApiError> {
    let tasks = ctx.calendar.find_tasks(scope.user_id, &ItemFilter::by_id(id)).await?;
    let task = tasks
        .into_iter()
        .next()
        .ok_or_else(|| TimewiseError::NotFound(format!("Task {id} not found")))?;
    Ok(Json(task))
}

/// `PUT /tasks/{id}`
pub async fn update(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = ctx.calendar.update_task(req.user_id, id, req.patch).await?;
    Ok(Json(task))
}

/// `DELETE /tasks/{id}?user_id=N`
pub async fn remove(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Query(scope): Query<UserScope>,
) -> Result<StatusCode, ApiError> {
    ctx.calendar.delete_task(scope.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
