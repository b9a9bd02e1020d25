//! Storage infrastructure - Storage implementations

mod factory;
mod in_memory;
pub mod migrations;
mod postgres;

pub use factory::{PROMO_BATCHES_TABLE, StorageFactory, WORKFLOWS_TABLE};
pub use in_memory::InMemoryStorage;
pub use migrations::{Migration, PostgresMigrator, run_storage_migrations};
pub use postgres::{PostgresConfig, PostgresStorage};
