//! Execution store implementations

mod in_memory;
mod postgres;

pub use in_memory::InMemoryExecutionStore;
pub use postgres::PostgresExecutionStore;
