use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{AssigneeStatus, WorkStatus};
use crate::users::repo_types::UserSummary;
use crate::validation::{double_option, iso_date};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    pub created_by: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    /// Replaces the assignee list; retained users keep their status.
    pub assigned_to: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub user_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeView {
    pub user_id: Uuid,
    /// `None` when the account no longer resolves.
    pub user: Option<UserSummary>,
    pub status: AssigneeStatus,
}

/// A work item with its people resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_by: Option<UserSummary>,
    pub status: WorkStatus,
    #[serde(with = "iso_date::option")]
    pub due_date: Option<Date>,
    pub assigned_to: Vec<AssigneeView>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct WorkResponse {
    pub success: bool,
    pub message: &'static str,
    pub work: WorkView,
}

#[derive(Debug, Serialize)]
pub struct WorkListResponse {
    pub success: bool,
    pub count: usize,
    pub works: Vec<WorkView>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}
