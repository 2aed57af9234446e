use tracing::{info, warn};
use uuid::Uuid;

use super::dto::UpdateProfileRequest;
use super::repo::DuplicateEmail;
use super::repo_types::{NewUser, NotificationPrefs, ProfilePatch, Role, User};
use crate::auth::dto::RegisterRequest;
use crate::auth::services::{hash_password, is_valid_email};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::validation::{parse_enum, required_text};

pub const MIN_PASSWORD_LEN: usize = 6;

fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    Ok(email)
}

/// A store-level email clash is a `Conflict`, like the lookup above it.
fn email_taken(e: anyhow::Error) -> AppError {
    if e.is::<DuplicateEmail>() {
        warn!("email claimed by a concurrent request");
        AppError::Conflict("Email already exists".into())
    } else {
        AppError::Internal(e)
    }
}

fn check_password(password: &str) -> AppResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Creates an account. `grantable` bounds the roles the caller may hand out;
/// a missing role defaults to staff.
pub async fn register_user(
    state: &AppState,
    req: RegisterRequest,
    grantable: &[Role],
) -> AppResult<User> {
    let name = required_text("name", req.name.as_deref())?;
    let email = normalize_email(&required_text("email", req.email.as_deref())?)?;
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".into()))?;
    check_password(&password)?;

    let role = match req.role.as_deref() {
        Some(raw) => parse_enum::<Role>("role", raw)?,
        None => Role::default(),
    };
    if !grantable.contains(&role) {
        warn!(role = ?role, "role not grantable by caller");
        return Err(AppError::Forbidden(format!("Cannot register with role {role:?}")));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already exists".into()));
    }

    let password_hash = hash_password(&password)?;
    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            role,
            profile_pic: req.profile_pic.unwrap_or_default().trim().to_string(),
            notifications: req.notifications.unwrap_or_default(),
        })
        .await
        .map_err(email_taken)?;

    info!(user_id = %user.id, email = %user.email, role = ?user.role, "user registered");
    Ok(user)
}

pub async fn get_user(state: &AppState, id: Uuid) -> AppResult<User> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn update_profile(
    state: &AppState,
    id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<User> {
    let mut patch = ProfilePatch::default();

    if let Some(name) = req.name {
        patch.name = Some(required_text("name", Some(&name))?);
    }
    if let Some(email) = req.email {
        let email = normalize_email(&email)?;
        if let Some(other) = state.users.find_by_email(&email).await? {
            if other.id != id {
                return Err(AppError::Conflict("Email already exists".into()));
            }
        }
        patch.email = Some(email);
    }
    if let Some(password) = req.password {
        check_password(&password)?;
        patch.password_hash = Some(hash_password(&password)?);
    }
    if let Some(pic) = req.profile_pic {
        patch.profile_pic = Some(pic.trim().to_string());
    }

    let user = state
        .users
        .update_profile(id, patch)
        .await
        .map_err(email_taken)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

pub async fn update_notifications(
    state: &AppState,
    id: Uuid,
    prefs: NotificationPrefs,
) -> AppResult<NotificationPrefs> {
    let user = state
        .users
        .update_notifications(id, prefs)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(user.notifications)
}
