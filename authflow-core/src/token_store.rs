//! Single-slot session token store
//!
//! [`TokenStore`] keeps the current session token in one named slot of a persistent
//! key/value backend, with an in-memory cache in front of it. The backend is opened lazily on
//! first access, exactly once even when several tasks race to be first.
//!
//! Writes go to the backend before the cache, so the cache is never ahead of durable
//! storage. Reads are served from the cache and fall back to the backend.
//!
//! The store is meant to be created once at startup and shared by `Arc` with every flow that
//! reads or writes the token.

use tokio::sync::{Mutex, OnceCell};

use crate::{
    Error,
    storage::{StorageProvider, TokenStorage},
};

/// Name of the slot holding the session token.
pub const DEFAULT_TOKEN_KEY: &str = "TOKEN_VALUE";

pub struct TokenStore<P: StorageProvider> {
    provider: P,
    key: String,
    storage: OnceCell<P::Storage>,
    cache: Mutex<Option<String>>,
}

impl<P: StorageProvider> TokenStore<P> {
    /// Create a store over the given backend, using [`DEFAULT_TOKEN_KEY`]
    pub fn new(provider: P) -> Self {
        Self::with_key(provider, DEFAULT_TOKEN_KEY)
    }

    /// Create a store that keeps the token under a custom slot name
    pub fn with_key(provider: P, key: impl Into<String>) -> Self {
        Self {
            provider,
            key: key.into(),
            storage: OnceCell::new(),
            cache: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the backend has been opened yet
    pub fn is_initialized(&self) -> bool {
        self.storage.initialized()
    }

    async fn storage(&self) -> Result<&P::Storage, Error> {
        self.storage
            .get_or_try_init(|| async {
                tracing::debug!(key = %self.key, "Opening token storage");
                self.provider.open().await.inspect_err(|e| {
                    tracing::error!(error = %e, "Failed to open token storage");
                })
            })
            .await
    }

    /// Get the current token
    ///
    /// Returns the cached token when there is one, otherwise reads the slot from storage and
    /// caches what it finds.
    pub async fn get(&self) -> Result<Option<String>, Error> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.as_ref() {
            return Ok(Some(token.clone()));
        }

        let stored = self.storage().await?.load(&self.key).await?;
        cache.clone_from(&stored);
        Ok(stored)
    }

    /// Replace the current token
    ///
    /// `None` clears the slot. The cache is only updated once storage accepted the write.
    pub async fn set(&self, value: Option<String>) -> Result<(), Error> {
        let mut cache = self.cache.lock().await;
        let storage = self.storage().await?;

        let written = match value.as_deref() {
            Some(token) => storage.store(&self.key, token).await,
            None => storage.remove(&self.key).await,
        };
        written.inspect_err(|e| tracing::error!(error = %e, "Failed to persist session token"))?;

        *cache = value;
        tracing::debug!(key = %self.key, present = cache.is_some(), "Session token updated");
        Ok(())
    }

    /// True when a token is stored
    pub async fn is_authenticated(&self) -> Result<bool, Error> {
        Ok(self.get().await?.is_some())
    }
}
