//! Database connection management.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::error::DbResult;

/// Handle to the Rolegate database.
///
/// Holds the SQLite pool backing the challenge store, bound identities and
/// guild configuration. Cloning is cheap; all clones share the pool.
#[derive(Debug, Clone)]
pub struct RolegateDb {
    pool: SqlitePool,
}

impl RolegateDb {
    /// Open or create a database at the given path.
    ///
    /// This will:
    /// 1. Create the parent directory and database file if missing
    /// 2. Configure SQLite (WAL mode, foreign keys)
    /// 3. Run any pending migrations
    pub async fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening rolegate database: {}", path.to_string_lossy());

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("cache_size", "-16000") // 16MB cache
            .pragma("synchronous", "NORMAL") // Safe with WAL
            .pragma("temp_store", "MEMORY")
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(5) // single writer, readers can parallelize
            .connect_with(options)
            .await?;

        debug!("Database connection established");

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(1) // In-memory must be single connection to share state
            .connect_with(options)
            .await?;

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
        debug!("Running database migrations");
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Check if the database is healthy.
    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get row counts for the three tables.
    pub async fn stats(&self) -> DbResult<DbStats> {
        let pending: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pending_auth")
            .fetch_one(&self.pool)
            .await?;

        let bound: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bound_identities")
            .fetch_one(&self.pool)
            .await?;

        let guilds: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM guild_configs")
            .fetch_one(&self.pool)
            .await?;

        Ok(DbStats {
            pending_count: pending.0 as u64,
            bound_count: bound.0 as u64,
            guild_count: guilds.0 as u64,
        })
    }
}

/// Database statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStats {
    pub pending_count: u64,
    pub bound_count: u64,
    pub guild_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = RolegateDb::open_in_memory().await.unwrap();
        db.health_check().await.unwrap();

        let stats = db.stats().await.unwrap();
        assert_eq!(
            stats,
            DbStats {
                pending_count: 0,
                bound_count: 0,
                guild_count: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_open_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("rolegate.db");

        let db = RolegateDb::open(&db_path).await.unwrap();
        db.health_check().await.unwrap();
        assert!(db_path.exists());
        db.close().await;
    }
}
