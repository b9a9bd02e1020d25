//! Builds the document stores the engine keeps definitions in

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::storage::{Storage, StorageEntity};

use super::in_memory::InMemoryStorage;
use super::postgres::PostgresStorage;

/// Document tables created by the storage migrations
pub const WORKFLOWS_TABLE: &str = "workflows";
pub const PROMO_BATCHES_TABLE: &str = "promo_batches";

#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// In-memory store seeded with `entities`
    pub fn in_memory<E>(entities: Vec<E>) -> Arc<dyn Storage<E>>
    where
        E: StorageEntity + 'static,
    {
        Arc::new(InMemoryStorage::with_entities(entities))
    }

    /// Wraps an existing pool; the table is expected to exist already
    pub fn postgres<E>(pool: PgPool, table_name: &str) -> Arc<dyn Storage<E>>
    where
        E: StorageEntity + 'static,
    {
        Arc::new(PostgresStorage::new(pool, table_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::promo::{BatchId, DiscountType, PromoCodeBatch};

    #[tokio::test]
    async fn test_in_memory_store_is_seeded() {
        let batch = PromoCodeBatch::new(
            BatchId::new("summer").unwrap(),
            "Summer sale",
            DiscountType::Percentage,
            10.0,
        );
        let storage = StorageFactory::in_memory(vec![batch]);

        assert_eq!(storage.count().await.unwrap(), 1);
        assert!(storage.exists(&BatchId::new("summer").unwrap()).await.unwrap());
    }
}
