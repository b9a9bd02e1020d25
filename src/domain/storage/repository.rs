//! Generic storage trait

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

use super::entity::{StorageEntity, StorageKey};

/// CRUD operations over one entity type.
///
/// Workflows and promo-code batches are persisted through this trait; the
/// append-heavy execution trace has its own store (see
/// [`ExecutionStore`](crate::domain::execution::ExecutionStore)).
#[async_trait]
pub trait Storage<E>: Send + Sync + Debug
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError>;

    /// All entities, in insertion order where the backend can tell
    async fn list(&self) -> Result<Vec<E>, DomainError>;

    /// Fails with `Conflict` if the key is taken
    async fn create(&self, entity: E) -> Result<E, DomainError>;

    /// Fails with `NotFound` if the key is unknown
    async fn update(&self, entity: E) -> Result<E, DomainError>;

    async fn save(&self, entity: E) -> Result<E, DomainError> {
        if self.exists(entity.key()).await? {
            self.update(entity).await
        } else {
            self.create(entity).await
        }
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError>;

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.list().await?.len())
    }
}

/// Convenience lookup that turns a missing entity into `NotFound`
pub async fn require<E, S>(storage: &S, key: &E::Key, what: &str) -> Result<E, DomainError>
where
    E: StorageEntity + 'static,
    S: Storage<E> + ?Sized,
{
    storage
        .get(key)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("{} '{}' not found", what, key.as_str())))
}
