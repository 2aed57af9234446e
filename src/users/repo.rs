use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewUser, NotificationPrefs, ProfilePatch, Role, User, UserRow};

/// Another account already holds the email address.
#[derive(Debug, thiserror::Error)]
#[error("email already exists")]
pub struct DuplicateEmail;

/// Maps the `users.email` unique violation to [`DuplicateEmail`].
fn email_write_error(e: sqlx::Error, what: &'static str) -> anyhow::Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => DuplicateEmail.into(),
        _ => anyhow::Error::new(e).context(what),
    }
}

/// Lookup and mutation of user records.
///
/// `add_work_ref` / `remove_work_ref` maintain the reverse-index of works a
/// user is assigned to. Both have set semantics and are safe to repeat.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>>;
    /// All users, or only those whose role is in `roles`.
    async fn list(&self, roles: Option<&[Role]>) -> anyhow::Result<Vec<User>>;
    /// Fails with [`DuplicateEmail`] when the address is taken.
    async fn create(&self, user: NewUser) -> anyhow::Result<User>;
    /// Fails with [`DuplicateEmail`] when the new address is taken.
    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> anyhow::Result<Option<User>>;
    async fn update_notifications(
        &self,
        id: Uuid,
        prefs: NotificationPrefs,
    ) -> anyhow::Result<Option<User>>;
    async fn add_work_ref(&self, user_ids: &[Uuid], work_id: Uuid) -> anyhow::Result<()>;
    async fn remove_work_ref(&self, user_ids: &[Uuid], work_id: Uuid) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, profile_pic,
                   notify_email, notify_whatsapp, assigned_works, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, profile_pic,
                   notify_email, notify_whatsapp, assigned_works, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(row.map(User::from))
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, profile_pic,
                   notify_email, notify_whatsapp, assigned_works, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("find users by ids")?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn list(&self, roles: Option<&[Role]>) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, profile_pic,
                   notify_email, notify_whatsapp, assigned_works, created_at, updated_at
            FROM users
            WHERE $1::user_role[] IS NULL OR role = ANY($1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(roles.map(|r| r.to_vec()))
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, profile_pic,
                               notify_email, notify_whatsapp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, email, password_hash, role, profile_pic,
                      notify_email, notify_whatsapp, assigned_works, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.profile_pic)
        .bind(user.notifications.email)
        .bind(user.notifications.whatsapp)
        .fetch_one(&self.db)
        .await
        .map_err(|e| email_write_error(e, "insert user"))?;
        Ok(row.into())
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   email = COALESCE($3, email),
                   password_hash = COALESCE($4, password_hash),
                   profile_pic = COALESCE($5, profile_pic),
                   updated_at = now()
             WHERE id = $1
            RETURNING id, name, email, password_hash, role, profile_pic,
                      notify_email, notify_whatsapp, assigned_works, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.email)
        .bind(patch.password_hash)
        .bind(patch.profile_pic)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| email_write_error(e, "update user profile"))?;
        Ok(row.map(User::from))
    }

    async fn update_notifications(
        &self,
        id: Uuid,
        prefs: NotificationPrefs,
    ) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
               SET notify_email = $2, notify_whatsapp = $3, updated_at = now()
             WHERE id = $1
            RETURNING id, name, email, password_hash, role, profile_pic,
                      notify_email, notify_whatsapp, assigned_works, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(prefs.email)
        .bind(prefs.whatsapp)
        .fetch_optional(&self.db)
        .await
        .context("update notification preferences")?;
        Ok(row.map(User::from))
    }

    async fn add_work_ref(&self, user_ids: &[Uuid], work_id: Uuid) -> anyhow::Result<()> {
        if user_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            UPDATE users
               SET assigned_works = array_append(assigned_works, $2)
             WHERE id = ANY($1) AND NOT ($2 = ANY(assigned_works))
            "#,
        )
        .bind(user_ids)
        .bind(work_id)
        .execute(&self.db)
        .await
        .context("add work to assignees")?;
        Ok(())
    }

    async fn remove_work_ref(&self, user_ids: &[Uuid], work_id: Uuid) -> anyhow::Result<()> {
        if user_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            UPDATE users
               SET assigned_works = array_remove(assigned_works, $2)
             WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .bind(work_id)
        .execute(&self.db)
        .await
        .context("remove work from assignees")?;
        Ok(())
    }
}
