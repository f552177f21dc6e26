use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{StorageProvider, TokenStorage};
use crate::Error;

/// In-process storage backed by a shared map
///
/// Clones share the same map, so a new [`crate::token_store::TokenStore`] built over a clone
/// sees everything written through the old one. Useful for tests and ephemeral clients.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TokenStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Hands out clones of one [`MemoryStorage`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageProvider {
    storage: MemoryStorage,
}

impl MemoryStorageProvider {
    pub fn new(storage: MemoryStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    type Storage = MemoryStorage;

    async fn open(&self) -> Result<Self::Storage, Error> {
        Ok(self.storage.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load("TOKEN_VALUE").await.unwrap(), None);

        storage.store("TOKEN_VALUE", "abc").await.unwrap();
        assert_eq!(
            storage.load("TOKEN_VALUE").await.unwrap().as_deref(),
            Some("abc")
        );

        storage.remove("TOKEN_VALUE").await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let provider = MemoryStorageProvider::default();
        let first = provider.open().await.unwrap();
        let second = provider.open().await.unwrap();

        first.store("k", "v").await.unwrap();
        assert_eq!(second.load("k").await.unwrap().as_deref(), Some("v"));
    }
}
