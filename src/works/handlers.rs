use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    CreateWorkRequest, MessageResponse, SetStatusRequest, UpdateWorkRequest, WorkListResponse,
    WorkResponse, WorkView,
};
use super::services;
use crate::extract::{JsonBody, PathParam};
use crate::{error::AppResult, state::AppState};

pub fn work_routes() -> Router<AppState> {
    Router::new()
        .route("/work", get(list_works).post(create_work))
        .route("/work/user/:user_id", get(list_user_works))
        .route(
            "/work/:id",
            get(get_work).put(update_work).delete(delete_work),
        )
        .route("/work/:id/status", put(set_status))
}

#[instrument(skip(state, body))]
pub async fn create_work(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateWorkRequest>,
) -> AppResult<(StatusCode, Json<WorkResponse>)> {
    let work = services::create(&state, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(WorkResponse {
            success: true,
            message: "Work created successfully",
            work,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_works(State(state): State<AppState>) -> AppResult<Json<WorkListResponse>> {
    let works = services::list(&state).await?;
    Ok(Json(WorkListResponse {
        success: true,
        count: works.len(),
        works,
    }))
}

#[instrument(skip(state))]
pub async fn list_user_works(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<Uuid>,
) -> AppResult<Json<WorkListResponse>> {
    let works = services::list_for_user(&state, user_id).await?;
    Ok(Json(WorkListResponse {
        success: true,
        count: works.len(),
        works,
    }))
}

#[instrument(skip(state))]
pub async fn get_work(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<WorkView>> {
    Ok(Json(services::get_with_status(&state, id).await?))
}

#[instrument(skip(state, body))]
pub async fn update_work(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateWorkRequest>,
) -> AppResult<Json<WorkResponse>> {
    let work = services::update(&state, id, body).await?;
    Ok(Json(WorkResponse {
        success: true,
        message: "Work updated successfully",
        work,
    }))
}

#[instrument(skip(state))]
pub async fn delete_work(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    services::delete(&state, id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Work deleted successfully",
    }))
}

#[instrument(skip(state, body))]
pub async fn set_status(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<SetStatusRequest>,
) -> AppResult<Json<WorkResponse>> {
    let work = services::set_assignee_status(&state, id, body).await?;
    Ok(Json(WorkResponse {
        success: true,
        message: "Status updated successfully",
        work,
    }))
}
