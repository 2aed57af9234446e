use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AttendanceListResponse, AttendanceResponse, MarkAttendanceRequest};
use super::services;
use crate::extract::{JsonBody, PathParam};
use crate::{auth::services::AuthUser, error::AppResult, state::AppState};

pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(list_attendance))
        .route("/attendance/:user_id", post(mark_attendance))
        .route("/attendance/user/:user_id", get(list_user_attendance))
}

#[instrument(skip(state, _auth, body))]
pub async fn mark_attendance(
    State(state): State<AppState>,
    _auth: AuthUser,
    PathParam(user_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<MarkAttendanceRequest>,
) -> AppResult<Json<AttendanceResponse>> {
    let attendance = services::mark(&state, user_id, body).await?;
    Ok(Json(AttendanceResponse {
        success: true,
        message: "Attendance marked",
        attendance,
    }))
}

#[instrument(skip(state, _auth))]
pub async fn list_user_attendance(
    State(state): State<AppState>,
    _auth: AuthUser,
    PathParam(user_id): PathParam<Uuid>,
) -> AppResult<Json<AttendanceListResponse>> {
    let records = services::list_for_user(&state, user_id).await?;
    Ok(Json(AttendanceListResponse {
        success: true,
        count: records.len(),
        records,
    }))
}

#[instrument(skip(state, _auth))]
pub async fn list_attendance(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<AttendanceListResponse>> {
    let records = services::list(&state).await?;
    Ok(Json(AttendanceListResponse {
        success: true,
        count: records.len(),
        records,
    }))
}
