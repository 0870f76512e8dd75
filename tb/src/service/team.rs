//! TeamService - teams and their membership

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{ServiceError, ServiceResult};
use crate::domain::{Audit, Team};
use crate::loader::RequestContext;
use crate::repo::Repositories;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTeamInput {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update; listed assignees join the team, current members stay
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTeamInput {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
}

/// A team the acting user belongs to, with its head count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    #[serde(flatten)]
    pub team: Team,
    pub member_count: usize,
}

#[derive(Clone)]
pub struct TeamService {
    repos: Repositories,
}

impl TeamService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Create a team; the acting user, if any, becomes its first member
    pub async fn create_team(&self, ctx: &RequestContext, input: CreateTeamInput) -> ServiceResult<Team> {
        debug!(request_id = %ctx.request_id(), name = %input.name, "create_team: called");
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::bad_request("Team name must not be empty"));
        }

        let mut team = Team::new(name);
        team.description = input.description;
        team.audit = Audit::new(ctx.actor().map(str::to_string));
        let team = self.repos.teams.create(team).await?;

        let creator = match ctx.actor() {
            Some(actor) => self.repos.users.find_by_id(actor).await?,
            None => None,
        };
        let team = match creator {
            Some(user) => self.add_member(ctx, &team.id, &user.id).await?,
            None => team,
        };
        info!(team_id = %team.id, name = %team.name, "create_team: created");
        Ok(team)
    }

    /// Rename or redescribe a team and add the listed assignees
    ///
    /// Every assignee is checked before anything is written.
    pub async fn update_team(&self, ctx: &RequestContext, input: UpdateTeamInput) -> ServiceResult<Team> {
        debug!(request_id = %ctx.request_id(), team_id = %input.id, assignees = input.assignees.len(), "update_team: called");
        let mut team = self
            .repos
            .teams
            .find_by_id(&input.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Team not found"))?;

        let known = self.repos.users.find_many_by_ids(&input.assignees).await?;
        if let Some(missing) = input.assignees.iter().find(|id| !known.iter().any(|u| &u.id == *id)) {
            return Err(ServiceError::bad_request(format!("User not found: {}", missing)));
        }

        if let Some(name) = input.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ServiceError::bad_request("Team name must not be empty"));
            }
            team.name = name.to_string();
        }
        if let Some(description) = input.description {
            team.description = Some(description);
        }
        team.audit.touch(ctx.actor().map(str::to_string));
        let mut team = self.repos.teams.update(team).await?;

        for user_id in &input.assignees {
            team = self.add_member(ctx, &team.id, user_id).await?;
        }
        if let Some(loaders) = ctx.try_loaders() {
            loaders.teams.clear(&team.id);
        }
        info!(team_id = %team.id, members = team.member_ids.len(), "update_team: updated");
        Ok(team)
    }

    /// One team by id, through the request's team loader
    pub async fn team(&self, ctx: &RequestContext, id: &str) -> ServiceResult<Team> {
        debug!(request_id = %ctx.request_id(), team_id = %id, "team: called");
        ctx.loaders()
            .teams
            .load(id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Team not found"))
    }

    /// All teams, newest first
    pub async fn teams(&self, ctx: &RequestContext) -> ServiceResult<Vec<Team>> {
        debug!(request_id = %ctx.request_id(), "teams: called");
        Ok(self.repos.teams.list().await?)
    }

    /// Teams the acting user is a member of, newest first
    pub async fn teams_for_actor(&self, ctx: &RequestContext) -> ServiceResult<Vec<TeamSummary>> {
        let Some(actor) = ctx.actor() else {
            return Err(ServiceError::unauthorized("unauthorized: no acting user"));
        };
        debug!(request_id = %ctx.request_id(), %actor, "teams_for_actor: called");

        let summaries = self
            .repos
            .teams
            .list()
            .await?
            .into_iter()
            .filter(|team| team.has_member(actor))
            .map(|team| TeamSummary {
                member_count: team.member_ids.len(),
                team,
            })
            .collect();
        Ok(summaries)
    }

    /// Add `user_id` to the team, keeping both sides of the membership in step
    ///
    /// Adding an existing member is a no-op.
    pub async fn add_member(&self, ctx: &RequestContext, team_id: &str, user_id: &str) -> ServiceResult<Team> {
        debug!(request_id = %ctx.request_id(), %team_id, %user_id, "add_member: called");
        let mut team = self
            .repos
            .teams
            .find_by_id(team_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Team not found"))?;
        let mut user = self
            .repos
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::bad_request("User not found"))?;

        if team.has_member(user_id) {
            return Ok(team);
        }

        let actor = ctx.actor().map(str::to_string);
        team.member_ids.push(user.id.clone());
        team.audit.touch(actor.clone());
        let team = self.repos.teams.update(team).await?;

        if !user.team_ids.iter().any(|id| id == team_id) {
            user.team_ids.push(team.id.clone());
            user.audit.touch(actor);
            self.repos.users.update(user).await?;
        }

        if let Some(loaders) = ctx.try_loaders() {
            loaders.teams.clear(&team.id);
            loaders.users.clear(&user_id.to_string());
        }
        Ok(team)
    }
}
