//! UserService - registration and lookup

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{ServiceError, ServiceResult};
use crate::domain::{Audit, User};
use crate::loader::RequestContext;
use crate::repo::Repositories;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterUserInput {
    pub name: String,
    pub email: String,
}

/// Contact card for a user who can be handed a team's tasks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignedUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Clone)]
pub struct UserService {
    repos: Repositories,
}

impl UserService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Register a user; emails are unique, compared case-insensitively
    pub async fn register_user(&self, ctx: &RequestContext, input: RegisterUserInput) -> ServiceResult<User> {
        debug!(request_id = %ctx.request_id(), email = %input.email, "register_user: called");
        let name = input.name.trim();
        let email = input.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(ServiceError::bad_request("Name must not be empty"));
        }
        if !email.contains('@') {
            return Err(ServiceError::bad_request("Invalid email address"));
        }

        let taken = self.repos.users.list().await?.iter().any(|u| u.email.eq_ignore_ascii_case(&email));
        if taken {
            return Err(ServiceError::bad_request("Email already registered"));
        }

        let mut user = User::new(name, email);
        user.audit = Audit::new(ctx.actor().map(str::to_string));
        let user = self.repos.users.create(user).await?;
        info!(user_id = %user.id, "register_user: created");
        Ok(user)
    }

    /// One user by id, through the request's user loader
    pub async fn user(&self, ctx: &RequestContext, id: &str) -> ServiceResult<User> {
        debug!(request_id = %ctx.request_id(), user_id = %id, "user: called");
        ctx.loaders()
            .users
            .load(id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    /// Members of a team, in the order they joined
    pub async fn assignees_by_team(&self, ctx: &RequestContext, team_id: &str) -> ServiceResult<Vec<AssignedUser>> {
        debug!(request_id = %ctx.request_id(), %team_id, "assignees_by_team: called");
        let loaders = ctx.loaders();
        let team = loaders
            .teams
            .load(team_id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("Team not found"))?;

        let mut assignees = Vec::with_capacity(team.member_ids.len());
        for loaded in loaders.users.load_many(&team.member_ids).await {
            if let Some(user) = loaded? {
                assignees.push(AssignedUser {
                    id: user.id,
                    name: user.name,
                    email: user.email,
                });
            }
        }
        Ok(assignees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::domain::Team;
    use crate::loader::Loaders;

    fn ctx(repos: &Repositories) -> RequestContext {
        RequestContext::new(None).with_loaders(Loaders::new(repos, &LoaderConfig::default()))
    }

    fn input(name: &str, email: &str) -> RegisterUserInput {
        RegisterUserInput {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let repos = Repositories::in_memory();
        let service = UserService::new(repos.clone());
        let c = ctx(&repos);

        let user = service.register_user(&c, input("Ann", "Ann@Example.com")).await.unwrap();
        assert_eq!(user.email, "ann@example.com");
        assert_eq!(service.user(&c, &user.id).await.unwrap().name, "Ann");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repos = Repositories::in_memory();
        let service = UserService::new(repos.clone());
        let c = ctx(&repos);

        service.register_user(&c, input("Ann", "ann@example.com")).await.unwrap();
        let err = service.register_user(&c, input("Other Ann", "ANN@example.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let repos = Repositories::in_memory();
        let service = UserService::new(repos.clone());
        let err = service.register_user(&ctx(&repos), input("Ann", "not-an-email")).await.unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let repos = Repositories::in_memory();
        let service = UserService::new(repos.clone());
        let err = service.user(&ctx(&repos), "missing").await.unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_assignees_by_team_lists_members() {
        let repos = Repositories::in_memory();
        let service = UserService::new(repos.clone());
        let c = ctx(&repos);
        let ann = service.register_user(&c, input("Ann", "ann@example.com")).await.unwrap();
        let bo = service.register_user(&c, input("Bo", "bo@example.com")).await.unwrap();
        service.register_user(&c, input("Cy", "cy@example.com")).await.unwrap();

        let mut team = Team::new("Core");
        team.member_ids = vec![bo.id.clone(), ann.id.clone(), "gone".to_string()];
        let team = repos.teams.create(team).await.unwrap();

        let assignees = service.assignees_by_team(&c, &team.id).await.unwrap();
        let names: Vec<&str> = assignees.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Bo", "Ann"]);
        assert_eq!(assignees[1].email, "ann@example.com");
        assert_eq!(c.loaders().users.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn test_assignees_of_unknown_team() {
        let repos = Repositories::in_memory();
        let service = UserService::new(repos.clone());
        let err = service.assignees_by_team(&ctx(&repos), "missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Team not found");
    }
}
