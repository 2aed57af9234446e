use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{AssigneeStatus, Assignment, AssignmentRow, NewWork, Work, WorkRow};

/// Storage of work items and their assignment lists.
///
/// The users' reverse-index is not touched here; the work services keep it
/// in step through [`crate::users::repo::UserDirectory`].
#[async_trait]
pub trait WorkRepo: Send + Sync {
    /// Stores the work with every assignee `pending`.
    async fn insert(&self, work: NewWork) -> anyhow::Result<Work>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Work>>;
    /// Newest first.
    async fn list(&self) -> anyhow::Result<Vec<Work>>;
    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Work>>;
    /// Writes the scalar fields and replaces the assignment list. Entries
    /// already stored keep their status.
    async fn save(&self, work: &Work) -> anyhow::Result<Option<Work>>;
    /// Updates one entry. `false` when the user holds no entry on the work.
    async fn set_assignee_status(
        &self,
        work_id: Uuid,
        user_id: Uuid,
        status: AssigneeStatus,
    ) -> anyhow::Result<bool>;
    /// Returns the removed work so callers can clean up after its assignees.
    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Work>>;
}

#[derive(Clone)]
pub struct PgWorkRepo {
    db: PgPool,
}

impl PgWorkRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn attach_assignments(&self, rows: Vec<WorkRow>) -> anyhow::Result<Vec<Work>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let assignments = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT work_id, user_id, status
            FROM work_assignments
            WHERE work_id = ANY($1)
            ORDER BY work_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await
        .context("load work assignments")?;

        let mut by_work: HashMap<Uuid, Vec<Assignment>> = HashMap::new();
        for a in assignments {
            by_work.entry(a.work_id).or_default().push(Assignment {
                user: a.user_id,
                status: a.status,
            });
        }
        Ok(rows
            .into_iter()
            .map(|r| {
                let assigned = by_work.remove(&r.id).unwrap_or_default();
                r.into_work(assigned)
            })
            .collect())
    }
}

#[async_trait]
impl WorkRepo for PgWorkRepo {
    async fn insert(&self, work: NewWork) -> anyhow::Result<Work> {
        let mut tx = self.db.begin().await.context("begin insert work")?;
        let row = sqlx::query_as::<_, WorkRow>(
            r#"
            INSERT INTO works (id, title, description, created_by, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, created_by, status, due_date, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&work.title)
        .bind(&work.description)
        .bind(work.created_by)
        .bind(work.due_date)
        .fetch_one(&mut *tx)
        .await
        .context("insert work")?;

        sqlx::query(
            r#"
            INSERT INTO work_assignments (work_id, user_id, position)
            SELECT $1, u.user_id, u.ord::int
            FROM UNNEST($2::uuid[]) WITH ORDINALITY AS u(user_id, ord)
            "#,
        )
        .bind(row.id)
        .bind(&work.assignees)
        .execute(&mut *tx)
        .await
        .context("insert work assignments")?;
        tx.commit().await.context("commit insert work")?;

        let assigned = work.assignees.iter().copied().map(Assignment::pending).collect();
        Ok(row.into_work(assigned))
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Work>> {
        let row = sqlx::query_as::<_, WorkRow>(
            r#"
            SELECT id, title, description, created_by, status, due_date, created_at, updated_at
            FROM works
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find work")?;
        match row {
            Some(r) => Ok(self.attach_assignments(vec![r]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<Work>> {
        let rows = sqlx::query_as::<_, WorkRow>(
            r#"
            SELECT id, title, description, created_by, status, due_date, created_at, updated_at
            FROM works
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list works")?;
        self.attach_assignments(rows).await
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Work>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, WorkRow>(
            r#"
            SELECT id, title, description, created_by, status, due_date, created_at, updated_at
            FROM works
            WHERE id = ANY($1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("find works by ids")?;
        self.attach_assignments(rows).await
    }

    async fn save(&self, work: &Work) -> anyhow::Result<Option<Work>> {
        let mut tx = self.db.begin().await.context("begin save work")?;
        let row = sqlx::query_as::<_, WorkRow>(
            r#"
            UPDATE works
               SET title = $2, description = $3, status = $4, due_date = $5,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, title, description, created_by, status, due_date, created_at, updated_at
            "#,
        )
        .bind(work.id)
        .bind(&work.title)
        .bind(&work.description)
        .bind(work.status)
        .bind(work.due_date)
        .fetch_optional(&mut *tx)
        .await
        .context("update work")?;
        let Some(row) = row else {
            return Ok(None);
        };

        let users = work.assignee_ids();
        sqlx::query("DELETE FROM work_assignments WHERE work_id = $1 AND NOT (user_id = ANY($2))")
            .bind(work.id)
            .bind(&users)
            .execute(&mut *tx)
            .await
            .context("drop removed assignees")?;
        sqlx::query(
            r#"
            INSERT INTO work_assignments (work_id, user_id, position)
            SELECT $1, u.user_id, u.ord::int
            FROM UNNEST($2::uuid[]) WITH ORDINALITY AS u(user_id, ord)
            ON CONFLICT (work_id, user_id) DO UPDATE SET position = EXCLUDED.position
            "#,
        )
        .bind(work.id)
        .bind(&users)
        .execute(&mut *tx)
        .await
        .context("upsert assignees")?;
        tx.commit().await.context("commit save work")?;

        Ok(self.attach_assignments(vec![row]).await?.pop())
    }

    async fn set_assignee_status(
        &self,
        work_id: Uuid,
        user_id: Uuid,
        status: AssigneeStatus,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE work_assignments SET status = $3 WHERE work_id = $1 AND user_id = $2",
        )
        .bind(work_id)
        .bind(user_id)
        .bind(status)
        .execute(&self.db)
        .await
        .context("update assignee status")?;
        if res.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query("UPDATE works SET updated_at = now() WHERE id = $1")
            .bind(work_id)
            .execute(&self.db)
            .await
            .context("touch work")?;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Work>> {
        let Some(work) = self.find(id).await? else {
            return Ok(None);
        };
        let res = sqlx::query("DELETE FROM works WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete work")?;
        Ok((res.rows_affected() > 0).then_some(work))
    }
}
