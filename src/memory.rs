//! In-process store backing `AppState::fake()`.

use std::sync::Mutex;

use async_trait::async_trait;
use axum::extract::FromRef;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::attendance::repo::AttendanceRepo;
use crate::attendance::repo_types::{Attendance, AttendancePatch};
use crate::auth::services::JwtKeys;
use crate::bookings::repo::BookingRepo;
use crate::bookings::repo_types::{Booking, BookingStatus, NewBooking};
use crate::state::AppState;
use crate::users::repo::{DuplicateEmail, UserDirectory};
use crate::users::repo_types::{NewUser, NotificationPrefs, ProfilePatch, Role, User};
use crate::works::repo::WorkRepo;
use crate::works::repo_types::{AssigneeStatus, Assignment, NewWork, Work};

/// Rows are kept in insertion order; listings return them newest first.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    bookings: Mutex<Vec<Booking>>,
    works: Mutex<Vec<Work>>,
    attendance: Mutex<Vec<Attendance>>,
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list(&self, roles: Option<&[Role]>) -> anyhow::Result<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|u| roles.map_or(true, |r| r.contains(&u.role)))
            .cloned()
            .collect())
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(DuplicateEmail.into());
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            profile_pic: user.profile_pic,
            notifications: user.notifications,
            assigned_works: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &patch.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(DuplicateEmail.into());
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(pic) = patch.profile_pic {
            user.profile_pic = pic;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn update_notifications(
        &self,
        id: Uuid,
        prefs: NotificationPrefs,
    ) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.notifications = prefs;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn add_work_ref(&self, user_ids: &[Uuid], work_id: Uuid) -> anyhow::Result<()> {
        for user in self
            .users
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|u| user_ids.contains(&u.id))
        {
            if !user.assigned_works.contains(&work_id) {
                user.assigned_works.push(work_id);
            }
        }
        Ok(())
    }

    async fn remove_work_ref(&self, user_ids: &[Uuid], work_id: Uuid) -> anyhow::Result<()> {
        for user in self
            .users
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|u| user_ids.contains(&u.id))
        {
            user.assigned_works.retain(|w| *w != work_id);
        }
        Ok(())
    }
}

#[async_trait]
impl BookingRepo for MemoryStore {
    async fn insert(&self, booking: NewBooking) -> anyhow::Result<Booking> {
        let now = OffsetDateTime::now_utc();
        let booking = Booking {
            id: Uuid::new_v4(),
            customer: booking.customer,
            event: booking.event,
            place: booking.place,
            phone: booking.phone,
            date: booking.date,
            guests: booking.guests,
            items: booking.items,
            assigned_staff: Vec::new(),
            status: Default::default(),
            cancel_request: false,
            service_type: booking.service_type,
            created_at: now,
            updated_at: now,
        };
        self.bookings.lock().unwrap().push(booking.clone());
        Ok(booking)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<Booking>> {
        Ok(self.bookings.lock().unwrap().iter().rev().cloned().collect())
    }

    async fn list_by_customer(&self, customer: Uuid) -> anyhow::Result<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|b| b.customer == customer)
            .cloned()
            .collect())
    }

    async fn save(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> anyhow::Result<Option<Booking>> {
        let mut bookings = self.bookings.lock().unwrap();
        let Some(stored) = bookings.iter_mut().find(|b| b.id == booking.id) else {
            return Ok(None);
        };
        if stored.status != expected
            || (booking.status == BookingStatus::Completed && stored.cancel_request)
        {
            return Ok(None);
        }
        *stored = Booking {
            customer: stored.customer,
            cancel_request: stored.cancel_request,
            created_at: stored.created_at,
            updated_at: OffsetDateTime::now_utc(),
            ..booking.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn flag_cancel_request(&self, id: Uuid) -> anyhow::Result<Option<Booking>> {
        let mut bookings = self.bookings.lock().unwrap();
        let Some(stored) = bookings
            .iter_mut()
            .find(|b| b.id == id && !b.cancel_request && !b.status.is_terminal())
        else {
            return Ok(None);
        };
        stored.cancel_request = true;
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(Some(stored.clone()))
    }

    async fn resolve_cancel_request(
        &self,
        id: Uuid,
        approve: bool,
    ) -> anyhow::Result<Option<Booking>> {
        let mut bookings = self.bookings.lock().unwrap();
        let Some(stored) = bookings.iter_mut().find(|b| b.id == id && b.cancel_request) else {
            return Ok(None);
        };
        if approve {
            stored.status = BookingStatus::Cancelled;
        }
        stored.cancel_request = false;
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut bookings = self.bookings.lock().unwrap();
        let before = bookings.len();
        bookings.retain(|b| b.id != id);
        Ok(bookings.len() != before)
    }
}

#[async_trait]
impl WorkRepo for MemoryStore {
    async fn insert(&self, work: NewWork) -> anyhow::Result<Work> {
        let now = OffsetDateTime::now_utc();
        let work = Work {
            id: Uuid::new_v4(),
            title: work.title,
            description: work.description,
            created_by: work.created_by,
            status: Default::default(),
            due_date: work.due_date,
            assigned_to: work.assignees.into_iter().map(Assignment::pending).collect(),
            created_at: now,
            updated_at: now,
        };
        self.works.lock().unwrap().push(work.clone());
        Ok(work)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Work>> {
        Ok(self.works.lock().unwrap().iter().find(|w| w.id == id).cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<Work>> {
        Ok(self.works.lock().unwrap().iter().rev().cloned().collect())
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Work>> {
        Ok(self
            .works
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|w| ids.contains(&w.id))
            .cloned()
            .collect())
    }

    async fn save(&self, work: &Work) -> anyhow::Result<Option<Work>> {
        let mut works = self.works.lock().unwrap();
        let Some(stored) = works.iter_mut().find(|w| w.id == work.id) else {
            return Ok(None);
        };
        let assigned_to = work
            .assigned_to
            .iter()
            .map(|a| {
                stored
                    .assigned_to
                    .iter()
                    .find(|s| s.user == a.user)
                    .copied()
                    .unwrap_or_else(|| Assignment::pending(a.user))
            })
            .collect();
        *stored = Work {
            assigned_to,
            created_by: stored.created_by,
            created_at: stored.created_at,
            updated_at: OffsetDateTime::now_utc(),
            ..work.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn set_assignee_status(
        &self,
        work_id: Uuid,
        user_id: Uuid,
        status: AssigneeStatus,
    ) -> anyhow::Result<bool> {
        let mut works = self.works.lock().unwrap();
        let Some(work) = works.iter_mut().find(|w| w.id == work_id) else {
            return Ok(false);
        };
        let Some(entry) = work.assigned_to.iter_mut().find(|a| a.user == user_id) else {
            return Ok(false);
        };
        entry.status = status;
        work.updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Work>> {
        let mut works = self.works.lock().unwrap();
        let Some(pos) = works.iter().position(|w| w.id == id) else {
            return Ok(None);
        };
        Ok(Some(works.remove(pos)))
    }
}

#[async_trait]
impl AttendanceRepo for MemoryStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        date: Date,
        patch: AttendancePatch,
    ) -> anyhow::Result<Attendance> {
        let mut records = self.attendance.lock().unwrap();
        let now = OffsetDateTime::now_utc();
        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.user_id == user_id && r.date == date)
        {
            if let Some(status) = patch.status {
                existing.status = status;
            }
            if patch.check_in_time.is_some() {
                existing.check_in_time = patch.check_in_time;
            }
            if patch.check_out_time.is_some() {
                existing.check_out_time = patch.check_out_time;
            }
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let record = Attendance {
            id: Uuid::new_v4(),
            user_id,
            date,
            status: patch.status.unwrap_or_default(),
            check_in_time: patch.check_in_time,
            check_out_time: patch.check_out_time,
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Attendance>> {
        let mut out: Vec<Attendance> = self
            .attendance
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(out)
    }

    async fn list(&self) -> anyhow::Result<Vec<Attendance>> {
        let mut out: Vec<Attendance> = self.attendance.lock().unwrap().iter().rev().cloned().collect();
        out.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(out)
    }
}

/// Adds a user named `name` with address `<name>@canopus.example`.
pub async fn seed_user(state: &AppState, name: &str, role: Role) -> User {
    state
        .users
        .create(NewUser {
            name: name.to_string(),
            email: format!("{name}@canopus.example"),
            password_hash: "$argon2id$unusable".to_string(),
            role,
            profile_pic: String::new(),
            notifications: NotificationPrefs::default(),
        })
        .await
        .unwrap()
}

/// A valid access token for `user`.
pub fn bearer_for(state: &AppState, user: &User) -> String {
    JwtKeys::from_ref(state).sign_access(user.id).unwrap()
}
