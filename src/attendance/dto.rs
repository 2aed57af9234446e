use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{Attendance, AttendanceStatus};
use crate::users::repo_types::UserSummary;
use crate::validation::iso_date;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    pub status: Option<String>,
    pub check_in_time: Option<String>,
    pub check_out_time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceView {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub status: AttendanceStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub check_in_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub check_out_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl AttendanceView {
    pub fn new(record: Attendance, user: Option<UserSummary>) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            user,
            date: record.date,
            status: record.status,
            check_in_time: record.check_in_time,
            check_out_time: record.check_out_time,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub success: bool,
    pub message: &'static str,
    pub attendance: AttendanceView,
}

#[derive(Debug, Serialize)]
pub struct AttendanceListResponse {
    pub success: bool,
    pub count: usize,
    pub records: Vec<AttendanceView>,
}
