use serde::{Deserialize, Serialize};
use sqlx::{
    postgres::{PgHasArrayType, PgTypeInfo},
    FromRow,
};
use time::OffsetDateTime;
use uuid::Uuid;

/// Business role of an account. Endpoints declare the set they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Staff,
    Customer,
}

impl Role {
    pub const PRIVILEGED: &'static [Role] = &[Role::Admin, Role::Manager];
    pub const STAFF_SIDE: &'static [Role] = &[Role::Admin, Role::Manager, Role::Staff];
    pub const BOOKERS: &'static [Role] = &[Role::Admin, Role::Manager, Role::Customer];
}

impl PgHasArrayType for Role {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_user_role")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    pub email: bool,
    pub whatsapp: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email: true,
            whatsapp: true,
        }
    }
}

/// User record as exposed by the directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string
    pub role: Role,
    pub profile_pic: String,
    pub notifications: NotificationPrefs,
    pub assigned_works: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Address to notify by email, if the user opted in.
    pub fn mail_address(&self) -> Option<&str> {
        (self.notifications.email && !self.email.is_empty()).then_some(self.email.as_str())
    }
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile_pic: String,
    pub notify_email: bool,
    pub notify_whatsapp: bool,
    pub assigned_works: Vec<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            role: r.role,
            profile_pic: r.profile_pic,
            notifications: NotificationPrefs {
                email: r.notify_email,
                whatsapp: r.notify_whatsapp,
            },
            assigned_works: r.assigned_works,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile_pic: String,
    pub notifications: NotificationPrefs,
}

/// Fields replaced by a profile update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub profile_pic: Option<String>,
}

/// Identity shown next to bookings, works and attendance records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_pic: String,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
            profile_pic: u.profile_pic.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binds_as_postgres_value<T>(_: &T)
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
    }

    #[test]
    fn role_lists_bind_as_user_role_arrays() {
        let roles = Role::STAFF_SIDE.to_vec();
        binds_as_postgres_value(&roles);
        binds_as_postgres_value(&Some(roles));
        assert_eq!(
            <Vec<Role> as sqlx::Type<sqlx::Postgres>>::type_info(),
            PgTypeInfo::with_name("_user_role")
        );
    }
}
