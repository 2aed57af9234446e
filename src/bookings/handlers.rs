use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    BookingListResponse, BookingResponse, CreateBookingRequest, MessageResponse,
    ResolveCancelRequest, UpdateBookingRequest,
};
use super::services;
use crate::extract::{JsonBody, PathParam};
use crate::{
    auth::services::CurrentUser, error::AppResult, state::AppState, users::repo_types::Role,
};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/booking", get(list_bookings).post(create_booking))
        .route("/booking/user/:id", get(list_user_bookings))
        .route(
            "/booking/:id",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
}

pub fn cancel_routes() -> Router<AppState> {
    Router::new()
        .route("/booking/cancel-request/:id", patch(request_cancel))
        .route("/booking/cancel/:id", put(resolve_cancel))
}

#[instrument(skip(state, caller, body))]
pub async fn create_booking(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(body): JsonBody<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    caller.require_role(Role::BOOKERS)?;
    let booking = services::create(&state, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            success: true,
            message: "Booking created successfully",
            booking,
        }),
    ))
}

#[instrument(skip(state, caller))]
pub async fn list_bookings(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> AppResult<Json<BookingListResponse>> {
    caller.require_role(Role::PRIVILEGED)?;
    let bookings = state.bookings.list().await?;
    Ok(Json(BookingListResponse {
        success: true,
        count: bookings.len(),
        bookings,
    }))
}

#[instrument(skip(state, _caller))]
pub async fn list_user_bookings(
    State(state): State<AppState>,
    _caller: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<BookingListResponse>> {
    let bookings = state.bookings.list_by_customer(id).await?;
    Ok(Json(BookingListResponse {
        success: true,
        count: bookings.len(),
        bookings,
    }))
}

#[instrument(skip(state, _caller))]
pub async fn get_booking(
    State(state): State<AppState>,
    _caller: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<super::repo_types::Booking>> {
    Ok(Json(services::get(&state, id).await?))
}

#[instrument(skip(state, caller, body))]
pub async fn update_booking(
    State(state): State<AppState>,
    caller: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    caller.require_role(Role::PRIVILEGED)?;
    let booking = services::update(&state, id, body).await?;
    Ok(Json(BookingResponse {
        success: true,
        message: "Booking updated successfully",
        booking,
    }))
}

#[instrument(skip(state, caller))]
pub async fn delete_booking(
    State(state): State<AppState>,
    caller: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    caller.require_role(Role::PRIVILEGED)?;
    services::delete(&state, id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Booking deleted successfully",
    }))
}

/// Open: the customer signals intent, an admin or manager decides.
#[instrument(skip(state))]
pub async fn request_cancel(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = services::request_cancel(&state, id).await?;
    Ok(Json(BookingResponse {
        success: true,
        message: "Cancel request submitted",
        booking,
    }))
}

#[instrument(skip(state, caller))]
pub async fn resolve_cancel(
    State(state): State<AppState>,
    caller: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<ResolveCancelRequest>,
) -> AppResult<Json<BookingResponse>> {
    caller.require_role(Role::PRIVILEGED)?;
    let booking = services::resolve_cancel(&state, id, body.approve).await?;
    Ok(Json(BookingResponse {
        success: true,
        message: if body.approve {
            "Booking cancelled successfully"
        } else {
            "Cancel request rejected"
        },
        booking,
    }))
}
