//! SQLite token storage for authflow
//!
//! [`SqliteStorageProvider`] connects to a database file (created if missing) and applies the
//! schema when the token store first needs it. Values live in a single `key_values` table.
//!
//! ```rust,no_run
//! use authflow_core::TokenStore;
//! use authflow_storage_sqlite::SqliteStorageProvider;
//!
//! # async fn run() -> Result<(), authflow_core::Error> {
//! let tokens = TokenStore::new(SqliteStorageProvider::new("sqlite://authflow.db?mode=rwc"));
//! tokens.set(Some("abc".to_string())).await?;
//! # Ok(())
//! # }
//! ```
mod migrations;

use std::str::FromStr;

use async_trait::async_trait;
use authflow_core::{
    Error,
    error::StorageError,
    storage::{StorageProvider, TokenStorage},
};
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::migrations::SqliteMigrationManager;

const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Opens [`SqliteStorage`] from a connection URL
#[derive(Debug, Clone)]
pub struct SqliteStorageProvider {
    url: String,
    max_connections: u32,
}

impl SqliteStorageProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StorageProvider for SqliteStorageProvider {
    type Storage = SqliteStorage;

    async fn open(&self) -> Result<Self::Storage, Error> {
        let options = SqliteConnectOptions::from_str(&self.url)
            .map_err(|e| Error::Storage(StorageError::Connection(e.to_string())))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to token database");
                Error::Storage(StorageError::Connection(e.to_string()))
            })?;

        let storage = SqliteStorage::new(pool);
        storage.migrate().await?;
        Ok(storage)
    }
}

#[derive(Debug)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the schema if it is not there yet
    pub async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        manager.up(&migrations::all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(
                "Failed to run migrations".to_string(),
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl TokenStorage for SqliteStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, Error> {
        sqlx::query_scalar::<_, String>("SELECT value FROM key_values WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO key_values (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM key_values WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(())
    }
}
