//! Application wiring
//!
//! [`App`] owns the long-lived parts (repositories, task bus, services) and
//! hands out one [`RequestContext`] per inbound request, each carrying a
//! fresh loader set.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::loader::{Loaders, RequestContext};
use crate::repo::Repositories;
use crate::service::{TaskBus, TaskService, TeamService, UserService};

pub struct App {
    config: Config,
    repos: Repositories,
    bus: Arc<TaskBus>,
    pub tasks: TaskService,
    pub teams: TeamService,
    pub users: UserService,
}

impl App {
    /// Build an app over in-memory repositories
    pub fn new(config: Config) -> Self {
        Self::with_repositories(config, Repositories::in_memory())
    }

    /// Build an app over the given repositories
    pub fn with_repositories(config: Config, repos: Repositories) -> Self {
        debug!(app = %config.app.name, capacity = config.events.channel_capacity, "App::new: called");
        let bus = Arc::new(TaskBus::new(config.events.channel_capacity));
        Self {
            tasks: TaskService::new(repos.clone(), Arc::clone(&bus)),
            teams: TeamService::new(repos.clone()),
            users: UserService::new(repos.clone()),
            config,
            repos,
            bus,
        }
    }

    /// Start a request acting as `actor`, with its own loaders
    pub fn begin_request(&self, actor: Option<&str>) -> RequestContext {
        let loaders = Loaders::new(&self.repos, &self.config.loader);
        RequestContext::new(actor.map(str::to_string)).with_loaders(loaders)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    pub fn bus(&self) -> &Arc<TaskBus> {
        &self.bus
    }

    /// End every live subscription; their streams finish
    pub fn shutdown(&self) -> usize {
        let closed = self.bus.shutdown();
        info!(closed, "App::shutdown: closed subscriptions");
        closed
    }
}
