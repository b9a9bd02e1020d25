//! Storage entity traits

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

/// Key of a stored entity; backends persist it as a string
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + std::hash::Hash {
    fn as_str(&self) -> &str;
}

/// An entity that can be persisted by a [`Storage`](super::Storage) backend
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    type Key: StorageKey;

    fn key(&self) -> &Self::Key;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    struct BatchKey(String);

    impl StorageKey for BatchKey {
        fn as_str(&self) -> &str {
            &self.0
        }
    }

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct Batch {
        id: BatchKey,
        name: String,
    }

    impl StorageEntity for Batch {
        type Key = BatchKey;

        fn key(&self) -> &Self::Key {
            &self.id
        }
    }

    #[test]
    fn test_entity_exposes_key() {
        let batch = Batch {
            id: BatchKey("summer-sale".to_string()),
            name: "Summer Sale".to_string(),
        };
        assert_eq!(batch.key().as_str(), "summer-sale");
        assert_eq!(batch.name, "Summer Sale");
    }
}
