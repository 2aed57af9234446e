use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Overall progress of a work item, set directly by its editors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "work_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum WorkStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

/// Readiness reported by one assignee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "assignee_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssigneeStatus {
    #[default]
    Pending,
    Ready,
    Leave,
}

impl AssigneeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssigneeStatus::Pending => "pending",
            AssigneeStatus::Ready => "ready",
            AssigneeStatus::Leave => "leave",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub user: Uuid,
    pub status: AssigneeStatus,
}

impl Assignment {
    pub fn pending(user: Uuid) -> Self {
        Self {
            user,
            status: AssigneeStatus::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Work {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_by: Option<Uuid>,
    pub status: WorkStatus,
    pub due_date: Option<Date>,
    /// In assignment order.
    pub assigned_to: Vec<Assignment>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Work {
    pub fn assignee_ids(&self) -> Vec<Uuid> {
        self.assigned_to.iter().map(|a| a.user).collect()
    }

    pub fn is_assigned(&self, user_id: Uuid) -> bool {
        self.assigned_to.iter().any(|a| a.user == user_id)
    }
}

#[derive(Debug, FromRow)]
pub struct WorkRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_by: Option<Uuid>,
    pub status: WorkStatus,
    pub due_date: Option<Date>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl WorkRow {
    pub fn into_work(self, assigned_to: Vec<Assignment>) -> Work {
        Work {
            id: self.id,
            title: self.title,
            description: self.description,
            created_by: self.created_by,
            status: self.status,
            due_date: self.due_date,
            assigned_to,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct AssignmentRow {
    pub work_id: Uuid,
    pub user_id: Uuid,
    pub status: AssigneeStatus,
}

#[derive(Debug, Clone)]
pub struct NewWork {
    pub title: String,
    pub description: String,
    pub created_by: Option<Uuid>,
    pub due_date: Option<Date>,
    pub assignees: Vec<Uuid>,
}
