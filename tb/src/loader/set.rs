//! The per-request loader set and its repository-backed fetches

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use super::batch::{BatchFn, LoadError, Loader};
use crate::config::LoaderConfig;
use crate::domain::{Entity, Task, Team, User};
use crate::repo::{Repositories, Repository};

/// Bulk fetch through [`Repository::find_many_by_ids`], aligned to the requested ids
pub struct RepositoryBatch<T: Entity> {
    repo: Arc<dyn Repository<T>>,
}

impl<T: Entity> RepositoryBatch<T> {
    pub fn new(repo: Arc<dyn Repository<T>>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<T: Entity> BatchFn<String, T> for RepositoryBatch<T> {
    async fn load(&self, keys: &[String]) -> Result<Vec<Option<T>>, LoadError> {
        debug!(kind = T::KIND, count = keys.len(), "RepositoryBatch::load: called");
        let rows = self.repo.find_many_by_ids(keys).await.map_err(|e| {
            error!(kind = T::KIND, error = %e, "RepositoryBatch::load: find_many_by_ids failed");
            LoadError::fetch(e)
        })?;

        let mut by_id: HashMap<String, T> = rows.into_iter().map(|row| (row.id().to_string(), row)).collect();
        Ok(keys.iter().map(|key| by_id.remove(key)).collect())
    }
}

/// One loader per batchable entity kind, scoped to a single request
#[derive(Clone)]
pub struct Loaders {
    pub users: Loader<String, User>,
    pub teams: Loader<String, Team>,
    pub tasks: Loader<String, Task>,
}

impl Loaders {
    /// Build a fresh set bound to `repos`
    pub fn new(repos: &Repositories, config: &LoaderConfig) -> Self {
        let wait = config.wait();
        let max_batch = config.max_batch;
        Self {
            users: Loader::with_options("users", RepositoryBatch::new(Arc::clone(&repos.users)), wait, max_batch),
            teams: Loader::with_options("teams", RepositoryBatch::new(Arc::clone(&repos.teams)), wait, max_batch),
            tasks: Loader::with_options("tasks", RepositoryBatch::new(Arc::clone(&repos.tasks)), wait, max_batch),
        }
    }

    /// Bulk fetches issued by all loaders in the set
    pub fn dispatch_count(&self) -> u64 {
        self.users.dispatch_count() + self.teams.dispatch_count() + self.tasks.dispatch_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;
    use crate::repo::{RepoError, RepoResult};

    struct BrokenUsers;

    #[async_trait]
    impl Repository<User> for BrokenUsers {
        async fn create(&self, record: User) -> RepoResult<User> {
            Ok(record)
        }
        async fn find_by_id(&self, _id: &str) -> RepoResult<Option<User>> {
            Ok(None)
        }
        async fn find_many_by_ids(&self, _ids: &[String]) -> RepoResult<Vec<User>> {
            Err(RepoError::Storage("connection reset".to_string()))
        }
        async fn update(&self, record: User) -> RepoResult<User> {
            Ok(record)
        }
        async fn delete(&self, id: &str) -> RepoResult<User> {
            Err(RepoError::NotFound {
                kind: "user",
                id: id.to_string(),
            })
        }
        async fn list(&self) -> RepoResult<Vec<User>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_repository_batch_aligns_rows() {
        let repos = Repositories::in_memory();
        let ann = repos.users.create(User::new("Ann", "ann@example.com")).await.unwrap();
        let bob = repos.users.create(User::new("Bob", "bob@example.com")).await.unwrap();

        let batch = RepositoryBatch::new(Arc::clone(&repos.users));
        let keys = vec![bob.id.clone(), "missing".to_string(), ann.id.clone()];
        let rows = batch.load(&keys).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].as_ref().unwrap().name, "Bob");
        assert!(rows[1].is_none());
        assert_eq!(rows[2].as_ref().unwrap().name, "Ann");
    }

    #[tokio::test]
    async fn test_repository_error_becomes_fetch_error() {
        let batch = RepositoryBatch::new(Arc::new(BrokenUsers) as Arc<dyn Repository<User>>);
        let err = batch.load(&["u-1".to_string()]).await.unwrap_err();
        assert_eq!(err.to_string(), "Batch fetch failed: Storage error: connection reset");
    }

    #[tokio::test]
    async fn test_loaders_batch_across_users() {
        let repos = Repositories::in_memory();
        let ann = repos.users.create(User::new("Ann", "ann@example.com")).await.unwrap();
        let bob = repos.users.create(User::new("Bob", "bob@example.com")).await.unwrap();

        let loaders = Loaders::new(&repos, &LoaderConfig::default());
        let (a, b, a_again) = tokio::join!(
            loaders.users.load(ann.id.clone()),
            loaders.users.load(bob.id.clone()),
            loaders.users.load(ann.id.clone()),
        );

        assert_eq!(a.unwrap().unwrap().name, "Ann");
        assert_eq!(b.unwrap().unwrap().name, "Bob");
        assert_eq!(a_again.unwrap().unwrap().name, "Ann");
        assert_eq!(loaders.dispatch_count(), 1);
    }
}
