use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::repo_types::{Attendance, AttendancePatch};

#[async_trait]
pub trait AttendanceRepo: Send + Sync {
    /// Creates the (user, date) record or overwrites its supplied fields.
    async fn upsert(
        &self,
        user_id: Uuid,
        date: Date,
        patch: AttendancePatch,
    ) -> anyhow::Result<Attendance>;
    /// Newest day first.
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Attendance>>;
    async fn list(&self) -> anyhow::Result<Vec<Attendance>>;
}

#[derive(Clone)]
pub struct PgAttendanceRepo {
    db: PgPool,
}

impl PgAttendanceRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AttendanceRepo for PgAttendanceRepo {
    async fn upsert(
        &self,
        user_id: Uuid,
        date: Date,
        patch: AttendancePatch,
    ) -> anyhow::Result<Attendance> {
        let row = sqlx::query_as::<_, Attendance>(
            r#"
            INSERT INTO attendance (id, user_id, date, status, check_in_time, check_out_time)
            VALUES ($1, $2, $3, COALESCE($4, 'present'::attendance_status), $5, $6)
            ON CONFLICT (user_id, date) DO UPDATE
               SET status = COALESCE($4, attendance.status),
                   check_in_time = COALESCE($5, attendance.check_in_time),
                   check_out_time = COALESCE($6, attendance.check_out_time),
                   updated_at = now()
            RETURNING id, user_id, date, status, check_in_time, check_out_time,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(date)
        .bind(patch.status)
        .bind(patch.check_in_time)
        .bind(patch.check_out_time)
        .fetch_one(&self.db)
        .await
        .context("upsert attendance")?;
        Ok(row)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Attendance>> {
        let rows = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, user_id, date, status, check_in_time, check_out_time, created_at, updated_at
            FROM attendance
            WHERE user_id = $1
            ORDER BY date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list attendance for user")?;
        Ok(rows)
    }

    async fn list(&self) -> anyhow::Result<Vec<Attendance>> {
        let rows = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, user_id, date, status, check_in_time, check_out_time, created_at, updated_at
            FROM attendance
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list attendance")?;
        Ok(rows)
    }
}
