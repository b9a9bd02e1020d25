//! Storage domain - generic persistence abstraction

mod entity;
mod repository;

pub use entity::{StorageEntity, StorageKey};
pub use repository::{Storage, require};
