use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{AttendanceView, MarkAttendanceRequest};
use super::repo_types::{AttendancePatch, AttendanceStatus};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::repo_types::UserSummary;
use crate::validation::{parse_enum, parse_timestamp};

fn patch_from(req: MarkAttendanceRequest) -> AppResult<AttendancePatch> {
    let patch = AttendancePatch {
        status: req
            .status
            .as_deref()
            .map(|raw| parse_enum::<AttendanceStatus>("status", raw))
            .transpose()?,
        check_in_time: req
            .check_in_time
            .as_deref()
            .map(|raw| parse_timestamp("checkInTime", raw))
            .transpose()?,
        check_out_time: req
            .check_out_time
            .as_deref()
            .map(|raw| parse_timestamp("checkOutTime", raw))
            .transpose()?,
    };
    if let (Some(check_in), Some(check_out)) = (patch.check_in_time, patch.check_out_time) {
        if check_out < check_in {
            return Err(AppError::Validation(
                "checkOutTime cannot be before checkInTime".into(),
            ));
        }
    }
    Ok(patch)
}

/// Records today's (UTC) attendance for `user_id`.
pub async fn mark(
    state: &AppState,
    user_id: Uuid,
    req: MarkAttendanceRequest,
) -> AppResult<AttendanceView> {
    let patch = patch_from(req)?;
    let Some(user) = state.users.find_by_id(user_id).await? else {
        warn!(%user_id, "attendance for unknown user");
        return Err(AppError::NotFound("User not found".into()));
    };

    let today = OffsetDateTime::now_utc().date();
    let record = state.attendance.upsert(user.id, today, patch).await?;
    info!(%user_id, date = %record.date, status = ?record.status, "attendance marked");
    Ok(AttendanceView::new(record, Some(UserSummary::from(&user))))
}

pub async fn list_for_user(state: &AppState, user_id: Uuid) -> AppResult<Vec<AttendanceView>> {
    let records = state.attendance.list_by_user(user_id).await?;
    Ok(records
        .into_iter()
        .map(|r| AttendanceView::new(r, None))
        .collect())
}

pub async fn list(state: &AppState) -> AppResult<Vec<AttendanceView>> {
    let records = state.attendance.list().await?;
    let mut ids: Vec<Uuid> = records.iter().map(|r| r.user_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let people: HashMap<Uuid, UserSummary> = state
        .users
        .find_many(&ids)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();
    Ok(records
        .into_iter()
        .map(|r| {
            let user = people.get(&r.user_id).cloned();
            AttendanceView::new(r, user)
        })
        .collect())
}
