//! Repository contract and the in-memory store
//!
//! Repositories own the entity records. The core only depends on the
//! [`Repository`] trait; [`MemoryRepository`] is the process-local
//! implementation used by the binary and the tests.

mod error;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Entity, Task, Team, User};

pub use error::{RepoError, RepoResult};
pub use memory::MemoryRepository;

/// CRUD contract per entity type
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Persist a new record; an empty id is replaced by a generated one
    async fn create(&self, record: T) -> RepoResult<T>;

    /// `Ok(None)` when no row has this id
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<T>>;

    /// Rows for the ids that exist, in no particular order
    async fn find_many_by_ids(&self, ids: &[String]) -> RepoResult<Vec<T>>;

    /// Replace an existing record
    async fn update(&self, record: T) -> RepoResult<T>;

    /// Remove a record and return it
    async fn delete(&self, id: &str) -> RepoResult<T>;

    /// All records, newest first
    async fn list(&self) -> RepoResult<Vec<T>>;
}

/// The full set of repositories, one per entity type
#[derive(Clone)]
pub struct Repositories {
    pub tasks: Arc<dyn Repository<Task>>,
    pub users: Arc<dyn Repository<User>>,
    pub teams: Arc<dyn Repository<Team>>,
}

impl Repositories {
    /// Repositories backed by process memory
    pub fn in_memory() -> Self {
        Self {
            tasks: Arc::new(MemoryRepository::<Task>::new()),
            users: Arc::new(MemoryRepository::<User>::new()),
            teams: Arc::new(MemoryRepository::<Team>::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_set_keeps_kinds_apart() {
        let repos = Repositories::in_memory();
        let team = repos.teams.create(Team::new("Core")).await.unwrap();
        let user = repos.users.create(User::new("Ann", "ann@example.com")).await.unwrap();

        assert!(repos.users.find_by_id(&team.id).await.unwrap().is_none());
        assert!(repos.teams.find_by_id(&user.id).await.unwrap().is_none());
        assert!(repos.tasks.list().await.unwrap().is_empty());

        let shared = repos.clone();
        assert_eq!(shared.teams.list().await.unwrap().len(), 1);
    }
}
