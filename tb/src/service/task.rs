//! TaskService - task mutations, queries and live task subscriptions

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::error::{ServiceError, ServiceResult};
use crate::domain::{Audit, DeletedTaskNotification, Task, TaskStatus};
use crate::events::{EventBus, EventKind, EventStream};
use crate::loader::RequestContext;
use crate::repo::Repositories;

/// Bus carrying task changes, grouped by team id
pub type TaskBus = EventBus<Task>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    /// RFC 3339 timestamp
    pub due_date: String,
    pub assigned_to: Option<String>,
    pub team_id: String,
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskInput {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// RFC 3339 timestamp
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveTaskInput {
    pub id: String,
    pub status: TaskStatus,
}

/// `assigned_to: None` unassigns the task
#[derive(Debug, Clone, Deserialize)]
pub struct AssignTaskInput {
    pub id: String,
    pub assigned_to: Option<String>,
}

fn parse_due_date(raw: &str) -> ServiceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| ServiceError::bad_request("Invalid due date format"))
}

/// Task use cases
#[derive(Clone)]
pub struct TaskService {
    repos: Repositories,
    bus: Arc<TaskBus>,
}

impl TaskService {
    pub fn new(repos: Repositories, bus: Arc<TaskBus>) -> Self {
        Self { repos, bus }
    }

    // === Mutations ===

    /// Create a task and announce it to the team
    pub async fn create_task(&self, ctx: &RequestContext, input: CreateTaskInput) -> ServiceResult<Task> {
        debug!(request_id = %ctx.request_id(), team_id = %input.team_id, title = %input.title, "create_task: called");
        let due_date = parse_due_date(&input.due_date)?;

        if input.title.trim().is_empty() {
            return Err(ServiceError::bad_request("Title must not be empty"));
        }
        if self.repos.teams.find_by_id(&input.team_id).await?.is_none() {
            return Err(ServiceError::bad_request("Team not found"));
        }
        if let Some(user_id) = &input.assigned_to {
            self.ensure_user(user_id).await?;
        }

        let task = Task {
            id: String::new(),
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or_default(),
            due_date,
            assigned_to: input.assigned_to,
            team_id: input.team_id,
            audit: Audit::new(ctx.actor().map(str::to_string)),
        };
        let created = self.repos.tasks.create(task).await?;

        self.announce(EventKind::Created, &created).await;
        info!(task_id = %created.id, team_id = %created.team_id, "create_task: created");
        Ok(created)
    }

    /// Apply the provided fields to an existing task
    pub async fn update_task(&self, ctx: &RequestContext, input: UpdateTaskInput) -> ServiceResult<Task> {
        debug!(request_id = %ctx.request_id(), task_id = %input.id, "update_task: called");
        let mut task = self.existing(&input.id).await?;

        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(ServiceError::bad_request("Title must not be empty"));
            }
            task.title = title;
        }
        if let Some(description) = input.description {
            task.description = Some(description);
        }
        if let Some(raw) = input.due_date {
            task.due_date = parse_due_date(&raw)?;
        }

        self.save(ctx, task).await
    }

    /// Move a task to another status column
    pub async fn move_task(&self, ctx: &RequestContext, input: MoveTaskInput) -> ServiceResult<Task> {
        debug!(request_id = %ctx.request_id(), task_id = %input.id, status = %input.status, "move_task: called");
        let mut task = self.existing(&input.id).await?;
        task.status = input.status;
        self.save(ctx, task).await
    }

    /// Assign a task to a user, or clear the assignment
    pub async fn assign_task(&self, ctx: &RequestContext, input: AssignTaskInput) -> ServiceResult<Task> {
        debug!(request_id = %ctx.request_id(), task_id = %input.id, assigned_to = ?input.assigned_to, "assign_task: called");
        let mut task = self.existing(&input.id).await?;
        if let Some(user_id) = &input.assigned_to {
            self.ensure_user(user_id).await?;
        }
        task.assigned_to = input.assigned_to;
        self.save(ctx, task).await
    }

    /// Delete a task and announce the deletion to the team
    pub async fn delete_task(&self, ctx: &RequestContext, id: &str) -> ServiceResult<()> {
        debug!(request_id = %ctx.request_id(), task_id = %id, "delete_task: called");
        let existing = self.existing(id).await?;
        let removed = self.repos.tasks.delete(&existing.id).await?;

        if let Some(loaders) = ctx.try_loaders() {
            loaders.tasks.clear(&removed.id);
        }
        self.announce(EventKind::Deleted, &removed).await;
        info!(task_id = %removed.id, team_id = %removed.team_id, "delete_task: deleted");
        Ok(())
    }

    // === Queries ===

    /// One task by id, through the request's task loader
    pub async fn task(&self, ctx: &RequestContext, id: &str) -> ServiceResult<Task> {
        debug!(request_id = %ctx.request_id(), task_id = %id, "task: called");
        ctx.loaders()
            .tasks
            .load(id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Task not found"))
    }

    /// A team's tasks, newest first, optionally only one status
    pub async fn tasks_by_team(
        &self,
        ctx: &RequestContext,
        team_id: &str,
        status: Option<TaskStatus>,
    ) -> ServiceResult<Vec<Task>> {
        debug!(request_id = %ctx.request_id(), %team_id, ?status, "tasks_by_team: called");
        let tasks: Vec<Task> = self
            .repos
            .tasks
            .list()
            .await?
            .into_iter()
            .filter(|t| t.team_id == team_id)
            .filter(|t| status.is_none_or(|s| t.status == s))
            .collect();

        // Later single-task lookups in this request reuse these rows
        if let Some(loaders) = ctx.try_loaders() {
            for task in &tasks {
                loaders.tasks.prime(task.id.clone(), task.clone());
            }
        }
        Ok(tasks)
    }

    // === Subscriptions ===

    /// Tasks created in `team_id` from now on
    pub fn task_created(&self, team_id: &str) -> EventStream<Task> {
        EventStream::spawn(Arc::clone(&self.bus), team_id, EventKind::Created, |e| e.payload().clone())
    }

    /// Tasks updated in `team_id` from now on
    pub fn task_updated(&self, team_id: &str) -> EventStream<Task> {
        EventStream::spawn(Arc::clone(&self.bus), team_id, EventKind::Updated, |e| e.payload().clone())
    }

    /// Deletions in `team_id` from now on
    pub fn task_deleted(&self, team_id: &str) -> EventStream<DeletedTaskNotification> {
        EventStream::spawn(Arc::clone(&self.bus), team_id, EventKind::Deleted, |e| {
            DeletedTaskNotification::new(e.payload().id.clone())
        })
    }

    // === Helpers ===

    async fn existing(&self, id: &str) -> ServiceResult<Task> {
        self.repos
            .tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task not found"))
    }

    async fn ensure_user(&self, user_id: &str) -> ServiceResult<()> {
        match self.repos.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::bad_request("Assigned user not found")),
        }
    }

    /// Persist a changed task, refresh the request cache and announce the update
    async fn save(&self, ctx: &RequestContext, mut task: Task) -> ServiceResult<Task> {
        task.audit.touch(ctx.actor().map(str::to_string));
        let updated = self.repos.tasks.update(task).await?;

        if let Some(loaders) = ctx.try_loaders() {
            loaders.tasks.clear(&updated.id);
        }
        self.announce(EventKind::Updated, &updated).await;
        Ok(updated)
    }

    /// Fire-and-forget publish; never fails the mutation
    async fn announce(&self, kind: EventKind, task: &Task) {
        let delivered = self.bus.publish(&task.team_id, kind, task.clone()).await;
        debug!(task_id = %task.id, team_id = %task.team_id, %kind, delivered, "announce: published");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::config::LoaderConfig;
    use crate::domain::{Team, User};
    use crate::loader::Loaders;

    struct Fixture {
        repos: Repositories,
        service: TaskService,
        team: Team,
        user: User,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::in_memory();
        let team = repos.teams.create(Team::new("Core")).await.unwrap();
        let user = repos.users.create(User::new("Ann", "ann@example.com")).await.unwrap();
        let service = TaskService::new(repos.clone(), Arc::new(TaskBus::default()));
        Fixture {
            repos,
            service,
            team,
            user,
        }
    }

    fn ctx(repos: &Repositories) -> RequestContext {
        RequestContext::new(Some("tester".to_string())).with_loaders(Loaders::new(repos, &LoaderConfig::default()))
    }

    fn input(team_id: &str, title: &str) -> CreateTaskInput {
        CreateTaskInput {
            title: title.to_string(),
            due_date: "2030-01-15T09:00:00Z".to_string(),
            team_id: team_id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_task_publishes_created() {
        let f = fixture().await;
        let mut created = f.service.task_created(&f.team.id);

        let task = f.service.create_task(&ctx(&f.repos), input(&f.team.id, "Write docs")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.audit.created_by.as_deref(), Some("tester"));

        let seen = timeout(Duration::from_secs(1), created.recv()).await.unwrap().unwrap();
        assert_eq!(seen.id, task.id);
        assert_eq!(seen.title, "Write docs");
    }

    #[tokio::test]
    async fn test_create_task_rejects_bad_due_date() {
        let f = fixture().await;
        let mut bad = input(&f.team.id, "Broken");
        bad.due_date = "next tuesday".to_string();

        let err = f.service.create_task(&ctx(&f.repos), bad).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid due date format");
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_create_task_unknown_assignee() {
        let f = fixture().await;
        let mut with_ghost = input(&f.team.id, "Assigned");
        with_ghost.assigned_to = Some("ghost".to_string());

        let err = f.service.create_task(&ctx(&f.repos), with_ghost).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
        assert!(f.repos.tasks.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_task_unknown_team() {
        let f = fixture().await;
        let err = f
            .service
            .create_task(&ctx(&f.repos), input("no-such-team", "Orphan"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Team not found");
    }

    #[tokio::test]
    async fn test_update_task_partial_fields() {
        let f = fixture().await;
        let c = ctx(&f.repos);
        let task = f.service.create_task(&c, input(&f.team.id, "Draft")).await.unwrap();
        let mut updated = f.service.task_updated(&f.team.id);

        let result = f
            .service
            .update_task(
                &c,
                UpdateTaskInput {
                    id: task.id.clone(),
                    description: Some("More detail".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(result.title, "Draft");
        assert_eq!(result.description.as_deref(), Some("More detail"));

        let seen = timeout(Duration::from_secs(1), updated.recv()).await.unwrap().unwrap();
        assert_eq!(seen.description.as_deref(), Some("More detail"));
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let f = fixture().await;
        let err = f
            .service
            .update_task(
                &ctx(&f.repos),
                UpdateTaskInput {
                    id: "nope".to_string(),
                    title: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_move_and_assign_publish_updates() {
        let f = fixture().await;
        let c = ctx(&f.repos);
        let task = f.service.create_task(&c, input(&f.team.id, "Ship")).await.unwrap();
        let mut updated = f.service.task_updated(&f.team.id);

        f.service
            .move_task(
                &c,
                MoveTaskInput {
                    id: task.id.clone(),
                    status: TaskStatus::InProgress,
                },
            )
            .await
            .unwrap();
        f.service
            .assign_task(
                &c,
                AssignTaskInput {
                    id: task.id.clone(),
                    assigned_to: Some(f.user.id.clone()),
                },
            )
            .await
            .unwrap();

        let moved = updated.recv().await.unwrap();
        assert_eq!(moved.status, TaskStatus::InProgress);
        let assigned = updated.recv().await.unwrap();
        assert_eq!(assigned.assigned_to.as_deref(), Some(f.user.id.as_str()));
        assert_eq!(assigned.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_delete_publishes_notification_only_to_deleted_stream() {
        let f = fixture().await;
        let c = ctx(&f.repos);
        let task = f.service.create_task(&c, input(&f.team.id, "Temp")).await.unwrap();

        let mut created = f.service.task_created(&f.team.id);
        let mut deleted = f.service.task_deleted(&f.team.id);
        f.service.delete_task(&c, &task.id).await.unwrap();

        let note = timeout(Duration::from_secs(1), deleted.recv()).await.unwrap().unwrap();
        assert_eq!(note, DeletedTaskNotification::new(task.id.clone()));
        assert!(timeout(Duration::from_millis(50), created.recv()).await.is_err());

        let err = f.service.task(&c, &task.id).await.unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_delete_missing_task() {
        let f = fixture().await;
        let err = f.service.delete_task(&ctx(&f.repos), "missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Task not found");
    }

    #[tokio::test]
    async fn test_tasks_by_team_filters_and_primes() {
        let f = fixture().await;
        let c = ctx(&f.repos);
        let other = f.repos.teams.create(Team::new("Other")).await.unwrap();

        let a = f.service.create_task(&c, input(&f.team.id, "A")).await.unwrap();
        let mut b = input(&f.team.id, "B");
        b.status = Some(TaskStatus::Done);
        f.service.create_task(&c, b).await.unwrap();
        f.service.create_task(&c, input(&other.id, "C")).await.unwrap();

        let all = f.service.tasks_by_team(&c, &f.team.id, None).await.unwrap();
        assert_eq!(all.len(), 2);
        let done = f.service.tasks_by_team(&c, &f.team.id, Some(TaskStatus::Done)).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].title, "B");

        let before = c.loaders().tasks.dispatch_count();
        let fetched = f.service.task(&c, &a.id).await.unwrap();
        assert_eq!(fetched.title, "A");
        assert_eq!(c.loaders().tasks.dispatch_count(), before);
    }

    #[tokio::test]
    async fn test_mutation_without_subscribers_succeeds() {
        let f = fixture().await;
        let task = f.service.create_task(&ctx(&f.repos), input(&f.team.id, "Quiet")).await;
        assert!(task.is_ok());
    }
}
