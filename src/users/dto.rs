use serde::{Deserialize, Serialize};

use super::repo_types::{NotificationPrefs, User};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "image")]
    pub profile_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotificationsRequest {
    pub email: bool,
    pub whatsapp: bool,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub message: &'static str,
    pub notifications: NotificationPrefs,
}
