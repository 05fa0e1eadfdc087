//! Meeting CRUD endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use timewise_core::ItemFilter;
use timewise_domain::{Meeting, MeetingDraft, MeetingPatch, TimewiseError};

use crate::context::AppContext;
use crate::routes::ApiError;

#[derive(Debug, Deserialize)]
pub struct UserScope {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateMeetingRequest {
    pub user_id: i64,
    #[serde(flatten)]
    pub draft: MeetingDraft,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeetingRequest {
    pub user_id: i64,
    #[serde(flatten)]
    pub patch: MeetingPatch,
}

/// `POST /meetings`
pub async fn create(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<CreateMeetingRequest>,
) -> Result<(StatusCode, Json<Meeting>), ApiError> {
    let meeting = ctx.calendar.create_meeting(req.user_id, req.draft).await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

/// `GET /meetings?user_id=N` - all meetings for a user, newest first.
pub async fn list(
    State(ctx): State<Arc<AppContext>>,
    Query(scope): Query<UserScope>,
) -> Result<Json<Vec<Meeting>>, ApiError> {
    let mut meetings = ctx.calendar.find_meetings(scope.user_id, &ItemFilter::default()).await?;
    meetings.reverse();
    Ok(Json(meetings))
}

/// `GET /meetings/{id}?user_id=N`
pub async fn get_one(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Query(scope): Query<UserScope>,
) -> Result<Json<Meeting>, ApiError> {
    let meetings = ctx.calendar.find_meetings(scope.user_id, &ItemFilter::by_id(id)).await?;
    let meeting = meetings
        .into_iter()
        .next()
        .ok_or_else(|| TimewiseError::NotFound(format!("Meeting {id} not found")))?;
    Ok(Json(meeting))
}

/// `PUT /meetings/{id}`
pub async fn update(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateMeetingRequest>,
) -> Result<Json<Meeting>, ApiError> {
    let meeting = ctx.calendar.update_meeting(req.user_id, id, req.patch).await?;
    Ok(Json(meeting))
}

/// `DELETE /meetings/{id}?user_id=N`
pub async fn remove(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Query(scope): Query<UserScope>,
) -> Result<StatusCode, ApiError> {
    ctx.calendar.delete_meeting(scope.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
