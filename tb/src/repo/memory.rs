//! In-memory repository

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{RepoError, RepoResult, Repository};
use crate::domain::{Entity, generate_id};

/// Repository keeping records in a map guarded by an async RwLock
pub struct MemoryRepository<T: Entity> {
    rows: RwLock<HashMap<String, T>>,
}

impl<T: Entity> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

impl<T: Entity> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn create(&self, mut record: T) -> RepoResult<T> {
        if record.id().is_empty() {
            record.assign_id(generate_id());
        }
        debug!(kind = T::KIND, id = %record.id(), "MemoryRepository::create: called");
        let mut rows = self.rows.write().await;
        if rows.contains_key(record.id()) {
            return Err(RepoError::Conflict {
                kind: T::KIND,
                id: record.id().to_string(),
            });
        }
        rows.insert(record.id().to_string(), record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &str) -> RepoResult<Option<T>> {
        debug!(kind = T::KIND, %id, "MemoryRepository::find_by_id: called");
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn find_many_by_ids(&self, ids: &[String]) -> RepoResult<Vec<T>> {
        debug!(kind = T::KIND, count = ids.len(), "MemoryRepository::find_many_by_ids: called");
        let rows = self.rows.read().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn update(&self, mut record: T) -> RepoResult<T> {
        debug!(kind = T::KIND, id = %record.id(), "MemoryRepository::update: called");
        let mut rows = self.rows.write().await;
        let Some(existing) = rows.get(record.id()) else {
            return Err(RepoError::NotFound {
                kind: T::KIND,
                id: record.id().to_string(),
            });
        };
        // Creation stamps are owned by the store
        let created_at = existing.audit().created_at;
        let created_by = existing.audit().created_by.clone();
        record.audit_mut().created_at = created_at;
        record.audit_mut().created_by = created_by;
        let modified_by = record.audit().modified_by.clone();
        record.audit_mut().touch(modified_by);
        rows.insert(record.id().to_string(), record.clone());
        Ok(record)
    }

    async fn delete(&self, id: &str) -> RepoResult<T> {
        debug!(kind = T::KIND, %id, "MemoryRepository::delete: called");
        self.rows.write().await.remove(id).ok_or_else(|| RepoError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        })
    }

    async fn list(&self) -> RepoResult<Vec<T>> {
        let mut all: Vec<T> = self.rows.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            b.audit()
                .created_at
                .cmp(&a.audit().created_at)
                .then_with(|| b.id().cmp(a.id()))
        });
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Team, User};

    #[tokio::test]
    async fn test_create_assigns_id() {
        let repo = MemoryRepository::<Team>::new();
        let team = repo.create(Team::new("Core")).await.unwrap();
        assert!(!team.id.is_empty());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let repo = MemoryRepository::<Team>::new();
        let mut team = Team::new("Core");
        team.id = "team-1".to_string();
        repo.create(team.clone()).await.unwrap();
        let err = repo.create(team).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_find_by_id_missing_is_none() {
        let repo = MemoryRepository::<User>::new();
        assert!(repo.find_by_id("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_many_skips_missing() {
        let repo = MemoryRepository::<User>::new();
        let a = repo.create(User::new("A", "a@example.com")).await.unwrap();
        let b = repo.create(User::new("B", "b@example.com")).await.unwrap();

        let ids = vec![a.id.clone(), "missing".to_string(), b.id.clone()];
        let found = repo.find_many_by_ids(&ids).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_update_preserves_creation_stamp() {
        let repo = MemoryRepository::<Team>::new();
        let created = repo.create(Team::new("Core")).await.unwrap();

        let mut changed = created.clone();
        changed.name = "Platform".to_string();
        changed.audit.created_at = chrono::Utc::now() + chrono::Duration::days(1);
        let updated = repo.update(changed).await.unwrap();

        assert_eq!(updated.name, "Platform");
        assert_eq!(updated.audit.created_at, created.audit.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = MemoryRepository::<Team>::new();
        let mut team = Team::new("Ghost");
        team.id = "ghost".to_string();
        let err = repo.update(team).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_returns_row() {
        let repo = MemoryRepository::<Team>::new();
        let team = repo.create(Team::new("Core")).await.unwrap();
        let removed = repo.delete(&team.id).await.unwrap();
        assert_eq!(removed.id, team.id);
        assert!(repo.is_empty().await);
        assert!(repo.delete(&team.id).await.unwrap_err().is_not_found());
    }
}
