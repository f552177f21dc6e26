use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

/// Table recording which schema versions have been applied.
pub(crate) const MIGRATION_TABLE: &str = "authflow_migrations";

#[async_trait]
pub(crate) trait Migration: Send + Sync {
    fn version(&self) -> i64;

    fn name(&self) -> &str;

    async fn up(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error>;
}

pub(crate) struct SqliteMigrationManager {
    pool: SqlitePool,
}

impl SqliteMigrationManager {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) async fn initialize(&self) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {MIGRATION_TABLE} (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL DEFAULT (unixepoch())
            );"#
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Apply every migration not yet recorded, each in its own transaction
    pub(crate) async fn up(&self, migrations: &[Box<dyn Migration>]) -> Result<(), sqlx::Error> {
        for migration in migrations {
            if self.is_applied(migration.version()).await? {
                continue;
            }

            tracing::info!(
                version = migration.version(),
                name = migration.name(),
                "Applying token schema migration"
            );

            let mut tx = self.pool.begin().await?;
            migration.up(&mut tx).await?;

            sqlx::query(&format!(
                "INSERT INTO {MIGRATION_TABLE} (version, name, applied_at) VALUES (?, ?, ?)"
            ))
            .bind(migration.version())
            .bind(migration.name())
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }
        Ok(())
    }

    pub(crate) async fn is_applied(&self, version: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {MIGRATION_TABLE} WHERE version = ?)"
        ))
        .bind(version)
        .fetch_one(&self.pool)
        .await
    }
}

pub(crate) struct CreateKeyValuesTable;

#[async_trait]
impl Migration for CreateKeyValuesTable {
    fn version(&self) -> i64 {
        1
    }

    fn name(&self) -> &str {
        "CreateKeyValuesTable"
    }

    async fn up(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS key_values (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (unixepoch())
            );"#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }
}

pub(crate) fn all() -> Vec<Box<dyn Migration>> {
    vec![Box::new(CreateKeyValuesTable)]
}
