//! Field resolvers backed by the request's loaders
//!
//! Each relation on a task, user or team is resolved through the
//! request-scoped [`Loaders`](crate::loader::Loaders), so resolving the
//! same relation for many parents in one request costs one bulk fetch
//! per entity kind rather than one fetch per parent.

use futures::future;
use serde::Serialize;
use tracing::debug;

use crate::domain::{Task, Team, User};
use crate::loader::{LoadError, RequestContext};

/// A task with its relations resolved
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub assigned_user: Option<User>,
    pub team: Option<Team>,
}

/// Resolves relations for the request that owns `ctx`
#[derive(Debug, Clone, Copy)]
pub struct TaskResolver<'a> {
    ctx: &'a RequestContext,
}

impl<'a> TaskResolver<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// `Task.assignedUser`; `None` when unassigned or the user is gone
    pub async fn assigned_user(&self, task: &Task) -> Result<Option<User>, LoadError> {
        match &task.assigned_to {
            Some(user_id) => self.ctx.loaders().users.load(user_id.clone()).await,
            None => Ok(None),
        }
    }

    /// `Task.team`
    pub async fn team(&self, task: &Task) -> Result<Option<Team>, LoadError> {
        self.ctx.loaders().teams.load(task.team_id.clone()).await
    }

    /// `Team.members`, skipping ids that no longer resolve
    pub async fn members(&self, team: &Team) -> Result<Vec<User>, LoadError> {
        debug!(team_id = %team.id, count = team.member_ids.len(), "TaskResolver::members: called");
        collect(self.ctx.loaders().users.load_many(&team.member_ids).await)
    }

    /// `User.teams`, skipping ids that no longer resolve
    pub async fn teams(&self, user: &User) -> Result<Vec<Team>, LoadError> {
        debug!(user_id = %user.id, count = user.team_ids.len(), "TaskResolver::teams: called");
        collect(self.ctx.loaders().teams.load_many(&user.team_ids).await)
    }

    /// Resolve both relations of one task concurrently
    pub async fn view(&self, task: Task) -> Result<TaskView, LoadError> {
        let (assigned_user, team) = future::try_join(self.assigned_user(&task), self.team(&task)).await?;
        Ok(TaskView {
            task,
            assigned_user,
            team,
        })
    }

    /// Resolve many tasks at once; their lookups share batch windows
    pub async fn views(&self, tasks: Vec<Task>) -> Result<Vec<TaskView>, LoadError> {
        debug!(count = tasks.len(), "TaskResolver::views: called");
        future::try_join_all(tasks.into_iter().map(|task| self.view(task))).await
    }
}

fn collect<V>(results: Vec<Result<Option<V>, LoadError>>) -> Result<Vec<V>, LoadError> {
    let mut found = Vec::with_capacity(results.len());
    for result in results {
        if let Some(value) = result? {
            found.push(value);
        }
    }
    Ok(found)
}
