//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::storage::{Storage, StorageEntity, StorageKey};

/// Thread-safe in-memory storage.
///
/// Entities are listed in insertion order. Data is lost when the process
/// terminates.
#[derive(Debug)]
pub struct InMemoryStorage<E>
where
    E: StorageEntity,
{
    entities: RwLock<Entries<E>>,
}

#[derive(Debug)]
struct Entries<E> {
    next_seq: u64,
    by_key: HashMap<String, (u64, E)>,
}

impl<E> Default for InMemoryStorage<E>
where
    E: StorageEntity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryStorage<E>
where
    E: StorageEntity,
{
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(Entries {
                next_seq: 0,
                by_key: HashMap::new(),
            }),
        }
    }

    /// Storage pre-populated with entities; later duplicates replace earlier ones
    pub fn with_entities(entities: Vec<E>) -> Self {
        let mut entries = Entries {
            next_seq: 0,
            by_key: HashMap::new(),
        };
        for entity in entities {
            let seq = entries.next_seq;
            entries.next_seq += 1;
            entries
                .by_key
                .insert(entity.key().as_str().to_string(), (seq, entity));
        }

        Self {
            entities: RwLock::new(entries),
        }
    }
}

fn lock_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::storage(format!("Failed to acquire storage lock: {}", e))
}

#[async_trait]
impl<E> Storage<E> for InMemoryStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        let entries = self.entities.read().map_err(lock_error)?;
        Ok(entries.by_key.get(key.as_str()).map(|(_, e)| e.clone()))
    }

    async fn list(&self) -> Result<Vec<E>, DomainError> {
        let entries = self.entities.read().map_err(lock_error)?;
        let mut all: Vec<&(u64, E)> = entries.by_key.values().collect();
        all.sort_by_key(|(seq, _)| *seq);
        Ok(all.into_iter().map(|(_, e)| e.clone()).collect())
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entries = self.entities.write().map_err(lock_error)?;

        if entries.by_key.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "Entity with key '{}' already exists",
                key
            )));
        }

        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.by_key.insert(key, (seq, entity.clone()));
        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entries = self.entities.write().map_err(lock_error)?;

        match entries.by_key.get_mut(&key) {
            Some((_, existing)) => {
                *existing = entity.clone();
                Ok(entity)
            }
            None => Err(DomainError::not_found(format!(
                "Entity with key '{}' not found",
                key
            ))),
        }
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError> {
        let mut entries = self.entities.write().map_err(lock_error)?;
        Ok(entries.by_key.remove(key.as_str()).is_some())
    }

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        let entries = self.entities.read().map_err(lock_error)?;
        Ok(entries.by_key.contains_key(key.as_str()))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let entries = self.entities.read().map_err(lock_error)?;
        Ok(entries.by_key.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::promo::{BatchId, DiscountType, PromoCodeBatch};

    fn batch(id: &str) -> PromoCodeBatch {
        PromoCodeBatch::new(BatchId::new(id).unwrap(), id, DiscountType::FixedAmount, 5.0)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let storage = InMemoryStorage::new();
        storage.create(batch("summer")).await.unwrap();

        let found = storage.get(&BatchId::new("summer").unwrap()).await.unwrap();
        assert_eq!(found.map(|b| b.name().to_string()), Some("summer".to_string()));
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let storage = InMemoryStorage::new();
        storage.create(batch("summer")).await.unwrap();

        let result = storage.create(batch("summer")).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let storage: InMemoryStorage<PromoCodeBatch> = InMemoryStorage::new();
        let result = storage.update(batch("ghost")).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let storage = InMemoryStorage::with_entities(vec![batch("c"), batch("a"), batch("b")]);
        let ids: Vec<String> = storage
            .list()
            .await
            .unwrap()
            .iter()
            .map(|b| b.id().to_string())
            .collect();

        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_save_upserts_and_delete() {
        let storage = InMemoryStorage::new();
        storage.save(batch("summer")).await.unwrap();
        storage
            .save(batch("summer").with_prefix("SUM-"))
            .await
            .unwrap();

        let key = BatchId::new("summer").unwrap();
        assert_eq!(storage.get(&key).await.unwrap().unwrap().prefix(), "SUM-");
        assert_eq!(storage.count().await.unwrap(), 1);

        assert!(storage.delete(&key).await.unwrap());
        assert!(!storage.exists(&key).await.unwrap());
        assert!(!storage.delete(&key).await.unwrap());
    }
}
