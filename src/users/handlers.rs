use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    NotificationsResponse, UpdateNotificationsRequest, UpdateProfileRequest, UserResponse,
};
use super::repo_types::{NotificationPrefs, Role, User};
use super::services;
use crate::extract::{JsonBody, PathParam};
use crate::{auth::services::CurrentUser, error::AppResult, state::AppState};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/user/profile/:id", get(get_profile).put(update_profile))
        .route("/user/profile/:id/notifications", put(update_notifications))
        .route("/user/users/some", get(list_staff))
        .route("/user/users", get(list_users))
}

#[instrument(skip(state, _caller))]
pub async fn get_profile(
    State(state): State<AppState>,
    _caller: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<User>> {
    Ok(Json(services::get_user(&state, id).await?))
}

#[instrument(skip(state, caller, body))]
pub async fn update_profile(
    State(state): State<AppState>,
    caller: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    caller.require_self_or(id, Role::PRIVILEGED)?;
    let user = services::update_profile(&state, id, body).await?;
    Ok(Json(UserResponse {
        message: "User updated successfully",
        user,
    }))
}

#[instrument(skip(state, caller))]
pub async fn update_notifications(
    State(state): State<AppState>,
    caller: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateNotificationsRequest>,
) -> AppResult<Json<NotificationsResponse>> {
    caller.require_self_or(id, Role::PRIVILEGED)?;
    let prefs = NotificationPrefs {
        email: body.email,
        whatsapp: body.whatsapp,
    };
    let notifications = services::update_notifications(&state, id, prefs).await?;
    Ok(Json(NotificationsResponse {
        message: "Notifications updated",
        notifications,
    }))
}

/// Staff-side accounts (admin, manager, staff), e.g. for assignment pickers.
#[instrument(skip(state, caller))]
pub async fn list_staff(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    caller.require_role(Role::PRIVILEGED)?;
    Ok(Json(state.users.list(Some(Role::STAFF_SIDE)).await?))
}

#[instrument(skip(state, caller))]
pub async fn list_users(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    caller.require_role(Role::PRIVILEGED)?;
    Ok(Json(state.users.list(None).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{bearer_for, seed_user};
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    fn authed(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn staff_edit_themselves_but_not_others() {
        let (state, _outbox) = AppState::fake();
        let ana = seed_user(&state, "ana", Role::Staff).await;
        let bo = seed_user(&state, "bo", Role::Staff).await;
        let token = bearer_for(&state, &ana);
        let app = crate::app::build_app(state);

        let own = app
            .clone()
            .oneshot(authed(
                "PUT",
                &format!("/api/user/profile/{}/notifications", ana.id),
                &token,
                serde_json::json!({ "email": false, "whatsapp": true }),
            ))
            .await
            .unwrap();
        assert_eq!(own.status(), StatusCode::OK);

        let other = app
            .oneshot(authed(
                "PUT",
                &format!("/api/user/profile/{}", bo.id),
                &token,
                serde_json::json!({ "name": "Bob" }),
            ))
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn staff_listing_is_privileged_and_skips_customers() {
        let (state, _outbox) = AppState::fake();
        let manager = seed_user(&state, "mia", Role::Manager).await;
        let staff = seed_user(&state, "sam", Role::Staff).await;
        seed_user(&state, "cat", Role::Customer).await;
        let manager_token = bearer_for(&state, &manager);
        let staff_token = bearer_for(&state, &staff);
        let app = crate::app::build_app(state);

        let denied = app
            .clone()
            .oneshot(authed("GET", "/api/user/users", &staff_token, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let res = app
            .oneshot(authed("GET", "/api/user/users/some", &manager_token, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let users: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let names: Vec<&str> = users
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["sam", "mia"]);
    }
}
