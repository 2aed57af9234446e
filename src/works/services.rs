use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{AssigneeView, CreateWorkRequest, SetStatusRequest, UpdateWorkRequest, WorkView};
use super::repo_types::{AssigneeStatus, Assignment, NewWork, Work, WorkStatus};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::repo_types::{User, UserSummary};
use crate::validation::{
    parse_date, parse_enum, parse_id, required_text, single_line_text, well_formed_ids,
};

/// Outcome of replacing an assignee list.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct AssigneeDiff {
    pub assigned: Vec<Assignment>,
    pub added: Vec<Uuid>,
    pub removed: Vec<Uuid>,
}

/// Replaces `current` with `next`, keeping the status of users present in both.
pub(crate) fn merge_assignees(current: &[Assignment], next: &[Uuid]) -> AssigneeDiff {
    let assigned: Vec<Assignment> = next
        .iter()
        .map(|id| {
            current
                .iter()
                .find(|a| a.user == *id)
                .copied()
                .unwrap_or_else(|| Assignment::pending(*id))
        })
        .collect();
    let added = next
        .iter()
        .filter(|id| !current.iter().any(|a| a.user == **id))
        .copied()
        .collect();
    let removed = current
        .iter()
        .map(|a| a.user)
        .filter(|id| !next.contains(id))
        .collect();
    AssigneeDiff {
        assigned,
        added,
        removed,
    }
}

/// Resolves a raw assignee list to users, in the order given.
async fn resolve_assignees(state: &AppState, raw: &[String]) -> AppResult<Vec<User>> {
    let ids = well_formed_ids(raw);
    if ids.is_empty() {
        warn!(supplied = raw.len(), "no valid assignees");
        return Err(AppError::Validation(
            "At least one valid assignee is required".into(),
        ));
    }
    let mut found = state.users.find_many(&ids).await?;
    let mut ordered = Vec::with_capacity(ids.len());
    for id in ids {
        match found.iter().position(|u| u.id == id) {
            Some(i) => ordered.push(found.swap_remove(i)),
            None => {
                warn!(user_id = %id, "unknown assignee");
                return Err(AppError::NotFound(format!("User {id} not found")));
            }
        }
    }
    Ok(ordered)
}

fn notify_assignees(state: &AppState, work: &Work, users: &[User]) {
    let due = work
        .due_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "not set".into());
    for user in users {
        let Some(to) = user.mail_address() else {
            continue;
        };
        state.notifier.send(
            to,
            format!("New work assigned: {}", work.title),
            format!(
                "Hello {},\n\nYou have been assigned a new work item.\n\nTitle: {}\nDescription: {}\nDue date: {}\n",
                user.name, work.title, work.description, due
            ),
        );
    }
}

async fn load(state: &AppState, id: Uuid) -> AppResult<Work> {
    state
        .works
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Work not found".into()))
}

async fn views(state: &AppState, works: Vec<Work>) -> AppResult<Vec<WorkView>> {
    let mut ids: Vec<Uuid> = works
        .iter()
        .flat_map(|w| w.assigned_to.iter().map(|a| a.user).chain(w.created_by))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    let people: HashMap<Uuid, UserSummary> = state
        .users
        .find_many(&ids)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    Ok(works
        .into_iter()
        .map(|w| WorkView {
            id: w.id,
            title: w.title,
            description: w.description,
            created_by: w.created_by.and_then(|id| people.get(&id).cloned()),
            status: w.status,
            due_date: w.due_date,
            assigned_to: w
                .assigned_to
                .iter()
                .map(|a| AssigneeView {
                    user_id: a.user,
                    user: people.get(&a.user).cloned(),
                    status: a.status,
                })
                .collect(),
            created_at: w.created_at,
            updated_at: w.updated_at,
        })
        .collect())
}

async fn view(state: &AppState, work: Work) -> AppResult<WorkView> {
    views(state, vec![work])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("work view lost")))
}

pub async fn create(state: &AppState, req: CreateWorkRequest) -> AppResult<WorkView> {
    let title = single_line_text("title", req.title.as_deref())?;
    let due_date = match req.due_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_date("dueDate", raw)?),
        _ => None,
    };
    let created_by = match req.created_by.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_id("createdBy", raw)?),
        _ => None,
    };
    let assignees = resolve_assignees(state, &req.assigned_to).await?;

    let work = state
        .works
        .insert(NewWork {
            title,
            description: req.description.unwrap_or_default().trim().to_string(),
            created_by,
            due_date,
            assignees: assignees.iter().map(|u| u.id).collect(),
        })
        .await?;
    state
        .users
        .add_work_ref(&work.assignee_ids(), work.id)
        .await?;
    notify_assignees(state, &work, &assignees);

    info!(work_id = %work.id, assignees = work.assigned_to.len(), "work created");
    view(state, work).await
}

pub async fn get_with_status(state: &AppState, id: Uuid) -> AppResult<WorkView> {
    let work = load(state, id).await?;
    view(state, work).await
}

pub async fn list(state: &AppState) -> AppResult<Vec<WorkView>> {
    let works = state.works.list().await?;
    views(state, works).await
}

/// Works listed in the user's reverse-index.
pub async fn list_for_user(state: &AppState, user_id: Uuid) -> AppResult<Vec<WorkView>> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let works = state.works.find_many(&user.assigned_works).await?;
    views(state, works).await
}

pub async fn update(state: &AppState, id: Uuid, req: UpdateWorkRequest) -> AppResult<WorkView> {
    let mut work = load(state, id).await?;

    if let Some(title) = req.title {
        work.title = single_line_text("title", Some(&title))?;
    }
    if let Some(description) = req.description {
        work.description = description.trim().to_string();
    }
    if let Some(raw) = req.status {
        work.status = parse_enum::<WorkStatus>("status", &raw)?;
    }
    if let Some(due) = req.due_date {
        work.due_date = match due.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(parse_date("dueDate", raw)?),
            _ => None,
        };
    }

    let mut diff = None;
    let mut newcomers = Vec::new();
    if let Some(raw) = req.assigned_to {
        let users = resolve_assignees(state, &raw).await?;
        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        let merged = merge_assignees(&work.assigned_to, &ids);
        newcomers = users
            .into_iter()
            .filter(|u| merged.added.contains(&u.id))
            .collect();
        work.assigned_to = merged.assigned.clone();
        diff = Some(merged);
    }

    let work = state
        .works
        .save(&work)
        .await?
        .ok_or_else(|| AppError::NotFound("Work not found".into()))?;

    if let Some(diff) = diff {
        state.users.remove_work_ref(&diff.removed, work.id).await?;
        state.users.add_work_ref(&diff.added, work.id).await?;
        notify_assignees(state, &work, &newcomers);
        info!(
            work_id = %work.id,
            added = diff.added.len(),
            removed = diff.removed.len(),
            "work assignees reconciled"
        );
    }

    info!(work_id = %work.id, "work updated");
    view(state, work).await
}

pub async fn set_assignee_status(
    state: &AppState,
    work_id: Uuid,
    req: SetStatusRequest,
) -> AppResult<WorkView> {
    let work = load(state, work_id).await?;
    let status =
        parse_enum::<AssigneeStatus>("status", &required_text("status", req.status.as_deref())?)?;
    let user_id = parse_id("userId", &required_text("userId", req.user_id.as_deref())?)?;

    if !work.is_assigned(user_id) || !state.works.set_assignee_status(work_id, user_id, status).await? {
        warn!(%work_id, %user_id, "status update from non-assignee");
        return Err(AppError::NotAssigned("User is not assigned to this work".into()));
    }

    info!(%work_id, %user_id, status = status.as_str(), "assignee status updated");
    get_with_status(state, work_id).await
}

pub async fn delete(state: &AppState, id: Uuid) -> AppResult<()> {
    let work = state
        .works
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Work not found".into()))?;
    state
        .users
        .remove_work_ref(&work.assignee_ids(), work.id)
        .await?;
    info!(work_id = %id, "work deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::seed_user;
    use crate::users::repo_types::{NotificationPrefs, Role};

    fn ids(users: &[&User]) -> Vec<String> {
        users.iter().map(|u| u.id.to_string()).collect()
    }

    async fn assigned_works(state: &AppState, user: &User) -> Vec<Uuid> {
        state
            .users
            .find_by_id(user.id)
            .await
            .unwrap()
            .unwrap()
            .assigned_works
    }

    fn status_of(view: &WorkView, user: &User) -> Option<AssigneeStatus> {
        view.assigned_to
            .iter()
            .find(|a| a.user_id == user.id)
            .map(|a| a.status)
    }

    #[tokio::test]
    async fn setup_hall_scenario() {
        let (state, mut outbox) = AppState::fake();
        let u1 = seed_user(&state, "u1", Role::Staff).await;
        let u2 = seed_user(&state, "u2", Role::Staff).await;

        let work = create(
            &state,
            CreateWorkRequest {
                title: Some("Setup Hall".into()),
                assigned_to: ids(&[&u1, &u2]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(status_of(&work, &u1), Some(AssigneeStatus::Pending));
        assert_eq!(status_of(&work, &u2), Some(AssigneeStatus::Pending));
        assert_eq!(assigned_works(&state, &u1).await, vec![work.id]);
        assert_eq!(assigned_works(&state, &u2).await, vec![work.id]);

        let first = outbox.try_recv().unwrap();
        let second = outbox.try_recv().unwrap();
        assert_eq!(first.to, u1.email);
        assert_eq!(second.to, u2.email);
        assert!(first.subject.contains("Setup Hall"));

        set_assignee_status(
            &state,
            work.id,
            SetStatusRequest {
                user_id: Some(u1.id.to_string()),
                status: Some("ready".into()),
            },
        )
        .await
        .unwrap();

        let view = get_with_status(&state, work.id).await.unwrap();
        assert_eq!(status_of(&view, &u1), Some(AssigneeStatus::Ready));
        assert_eq!(status_of(&view, &u2), Some(AssigneeStatus::Pending));
        assert_eq!(view.status, WorkStatus::Pending);
        let resolved = view.assigned_to[0].user.as_ref().unwrap();
        assert_eq!(resolved.name, "u1");
        assert_eq!(resolved.role, Role::Staff);
    }

    #[tokio::test]
    async fn reverse_index_follows_create_update_and_delete() {
        let (state, _outbox) = AppState::fake();
        let u1 = seed_user(&state, "u1", Role::Staff).await;
        let u2 = seed_user(&state, "u2", Role::Staff).await;
        let u3 = seed_user(&state, "u3", Role::Staff).await;

        let work = create(
            &state,
            CreateWorkRequest {
                title: Some("Stage lights".into()),
                assigned_to: ids(&[&u1, &u2]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        set_assignee_status(
            &state,
            work.id,
            SetStatusRequest {
                user_id: Some(u2.id.to_string()),
                status: Some("leave".into()),
            },
        )
        .await
        .unwrap();

        let updated = update(
            &state,
            work.id,
            UpdateWorkRequest {
                assigned_to: Some(ids(&[&u2, &u3])),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.assigned_to.len(), 2);
        assert_eq!(status_of(&updated, &u2), Some(AssigneeStatus::Leave));
        assert_eq!(status_of(&updated, &u3), Some(AssigneeStatus::Pending));
        assert!(assigned_works(&state, &u1).await.is_empty());
        assert_eq!(assigned_works(&state, &u2).await, vec![work.id]);
        assert_eq!(assigned_works(&state, &u3).await, vec![work.id]);

        let mine = list_for_user(&state, u3.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, work.id);

        delete(&state, work.id).await.unwrap();
        for u in [&u1, &u2, &u3] {
            assert!(assigned_works(&state, u).await.is_empty());
        }
        assert!(matches!(
            get_with_status(&state, work.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(delete(&state, work.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn non_assignee_status_change_is_refused() {
        let (state, _outbox) = AppState::fake();
        let u1 = seed_user(&state, "u1", Role::Staff).await;
        let outsider = seed_user(&state, "u9", Role::Staff).await;
        let work = create(
            &state,
            CreateWorkRequest {
                title: Some("Setup Hall".into()),
                assigned_to: ids(&[&u1]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = set_assignee_status(
            &state,
            work.id,
            SetStatusRequest {
                user_id: Some(outsider.id.to_string()),
                status: Some("ready".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotAssigned(_)));

        let bad_status = set_assignee_status(
            &state,
            work.id,
            SetStatusRequest {
                user_id: Some(u1.id.to_string()),
                status: Some("done".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(bad_status, AppError::Validation(_)));

        let missing = set_assignee_status(
            &state,
            Uuid::new_v4(),
            SetStatusRequest {
                user_id: Some(u1.id.to_string()),
                status: Some("ready".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        let view = get_with_status(&state, work.id).await.unwrap();
        assert_eq!(view.assigned_to.len(), 1);
        assert_eq!(status_of(&view, &u1), Some(AssigneeStatus::Pending));
    }

    #[tokio::test]
    async fn create_requires_title_and_known_assignees() {
        let (state, _outbox) = AppState::fake();
        let u1 = seed_user(&state, "u1", Role::Staff).await;

        let untitled = create(
            &state,
            CreateWorkRequest {
                title: Some("   ".into()),
                assigned_to: ids(&[&u1]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(untitled, AppError::Validation(_)));

        let garbage = create(
            &state,
            CreateWorkRequest {
                title: Some("Setup Hall".into()),
                assigned_to: vec!["nope".into(), String::new()],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(garbage, AppError::Validation(_)));

        let unknown = create(
            &state,
            CreateWorkRequest {
                title: Some("Setup Hall".into()),
                assigned_to: vec![u1.id.to_string(), Uuid::new_v4().to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(unknown, AppError::NotFound(_)));
        assert!(list(&state).await.unwrap().is_empty());
        assert!(assigned_works(&state, &u1).await.is_empty());
    }

    #[tokio::test]
    async fn multi_line_titles_are_refused_before_anything_is_mailed() {
        let (state, mut outbox) = AppState::fake();
        let u1 = seed_user(&state, "u1", Role::Staff).await;

        let err = create(
            &state,
            CreateWorkRequest {
                title: Some("Setup Hall\r\nBcc: someone@elsewhere.example".into()),
                assigned_to: ids(&[&u1]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(list(&state).await.unwrap().is_empty());
        assert!(outbox.try_recv().is_err());

        let work = create(
            &state,
            CreateWorkRequest {
                title: Some("Setup Hall".into()),
                assigned_to: ids(&[&u1]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let err = update(
            &state,
            work.id,
            UpdateWorkRequest {
                title: Some("Setup Hall\nBcc: someone@elsewhere.example".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(get_with_status(&state, work.id).await.unwrap().title, "Setup Hall");
    }

    #[tokio::test]
    async fn duplicate_assignees_collapse() {
        let (state, _outbox) = AppState::fake();
        let u1 = seed_user(&state, "u1", Role::Staff).await;
        let work = create(
            &state,
            CreateWorkRequest {
                title: Some("Setup Hall".into()),
                assigned_to: vec![u1.id.to_string(), "junk".into(), u1.id.to_string()],
                due_date: Some("2026-02-10".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(work.assigned_to.len(), 1);
        assert_eq!(work.due_date, Some(time::macros::date!(2026 - 02 - 10)));
    }

    #[tokio::test]
    async fn only_opted_in_newcomers_are_mailed_on_update() {
        let (state, mut outbox) = AppState::fake();
        let u1 = seed_user(&state, "u1", Role::Staff).await;
        let quiet = seed_user(&state, "u2", Role::Staff).await;
        let loud = seed_user(&state, "u3", Role::Staff).await;
        state
            .users
            .update_notifications(
                quiet.id,
                NotificationPrefs {
                    email: false,
                    whatsapp: true,
                },
            )
            .await
            .unwrap();

        let work = create(
            &state,
            CreateWorkRequest {
                title: Some("Setup Hall".into()),
                assigned_to: ids(&[&u1]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(outbox.try_recv().unwrap().to, u1.email);

        update(
            &state,
            work.id,
            UpdateWorkRequest {
                status: Some("in-progress".into()),
                assigned_to: Some(ids(&[&u1, &quiet, &loud])),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(outbox.try_recv().unwrap().to, loud.email);
        assert!(outbox.try_recv().is_err());

        let view = get_with_status(&state, work.id).await.unwrap();
        assert_eq!(view.status, WorkStatus::InProgress);
    }

    #[tokio::test]
    async fn update_rejects_empty_assignee_list() {
        let (state, _outbox) = AppState::fake();
        let u1 = seed_user(&state, "u1", Role::Staff).await;
        let work = create(
            &state,
            CreateWorkRequest {
                title: Some("Setup Hall".into()),
                assigned_to: ids(&[&u1]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = update(
            &state,
            work.id,
            UpdateWorkRequest {
                assigned_to: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(assigned_works(&state, &u1).await, vec![work.id]);
    }

    #[test]
    fn merge_keeps_status_of_retained_users() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let current = vec![
            Assignment {
                user: a,
                status: AssigneeStatus::Ready,
            },
            Assignment {
                user: b,
                status: AssigneeStatus::Leave,
            },
        ];
        let diff = merge_assignees(&current, &[c, b]);
        assert_eq!(
            diff.assigned,
            vec![
                Assignment::pending(c),
                Assignment {
                    user: b,
                    status: AssigneeStatus::Leave
                },
            ]
        );
        assert_eq!(diff.added, vec![c]);
        assert_eq!(diff.removed, vec![a]);
    }
}
