//! Persistent key/value storage for the session token
//!
//! Backends implement [`TokenStorage`] for reads and writes and [`StorageProvider`] for
//! opening the backend. Opening is deferred to the first token access, see
//! [`crate::token_store::TokenStore`].
mod memory;

pub use memory::{MemoryStorage, MemoryStorageProvider};

use async_trait::async_trait;

use crate::Error;

/// A durable string key/value store
#[async_trait]
pub trait TokenStorage: Send + Sync + 'static {
    /// Read the value stored under `key`
    async fn load(&self, key: &str) -> Result<Option<String>, Error>;

    /// Write `value` under `key`, replacing any previous value
    ///
    /// The write must be durable when this returns.
    async fn store(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Remove the value stored under `key`, if any
    async fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Opens a [`TokenStorage`] backend
///
/// `open` is called at most once per [`crate::token_store::TokenStore`] that succeeds in
/// opening. A failed open may be retried on a later access.
#[async_trait]
pub trait StorageProvider: Send + Sync + 'static {
    type Storage: TokenStorage;

    async fn open(&self) -> Result<Self::Storage, Error>;
}
