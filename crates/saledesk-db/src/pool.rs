//! # Opening the Store
//!
//! `DbConfig` says where the SQLite file lives and how many connections to
//! hand out; `Database::new` turns it into a migrated pool.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  DbConfig { path, max_connections, acquire_timeout }               │
//! │       │                                                            │
//! │       ▼  Database::new                                             │
//! │  open SqlitePool ──► apply pending migrations ──► Database         │
//! │                                                      │             │
//! │                         ┌────────────────────────────┤             │
//! │                         ▼                            ▼             │
//! │                   .sales()                      .outbox()          │
//! │              (request handlers)            (relay + health)        │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Files are opened in WAL mode so the relay can read the outbox while a
//! request commits. `:memory:` stores live on a single pinned connection;
//! a second connection would open a separate, empty database.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::outbox::EventOutboxRepository;
use crate::repository::sale::SaleRepository;

const MEMORY: &str = ":memory:";

// =============================================================================
// DbConfig
// =============================================================================

/// Where the store lives and how the pool is sized.
///
/// ## Example
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("saledesk.db").max_connections(8)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// A file-backed store, created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// A private in-memory store; gone once the `Database` is dropped.
    pub fn in_memory() -> Self {
        DbConfig {
            path: PathBuf::from(MEMORY),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == Path::new(MEMORY)
    }

    fn sqlite_options(&self) -> SqliteConnectOptions {
        let base = if self.is_in_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(&self.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        // sale_items rows go away with their sale
        base.foreign_keys(true)
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout);

        if self.is_in_memory() {
            options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options.idle_timeout(Some(Duration::from_secs(600)))
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool described by `config` and brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let pool = config
            .pool_options()
            .connect_with(config.sqlite_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            path = %config.path.display(),
            max_connections = config.max_connections,
            "Opened sales store"
        );

        let db = Database { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Safe to call repeatedly; sqlx records what it has applied.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        debug!("Schema is current");
        Ok(())
    }

    /// Raw pool access for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn outbox(&self) -> EventOutboxRepository {
        EventOutboxRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections to return, then closes them.
    /// Repository calls fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Sales store closed");
    }

    /// `true` when a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_is_migrated_and_healthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_memory_stores_do_not_share_tables() {
        let a = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = Database::new(DbConfig::in_memory()).await.unwrap();

        sqlx::query("CREATE TABLE only_in_a (x INTEGER)")
            .execute(a.pool())
            .await
            .unwrap();

        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = 'only_in_a'",
        )
        .fetch_one(b.pool())
        .await
        .unwrap();
        assert_eq!(found, 0);
    }

    #[tokio::test]
    async fn test_closed_store_reports_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_file_store_is_created_on_open() {
        let path = std::env::temp_dir().join(format!("saledesk-pool-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let db = Database::new(DbConfig::new(&path).max_connections(2)).await.unwrap();
        assert!(path.exists());
        assert!(db.health_check().await);
        db.close().await;

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_config_sizing() {
        let file = DbConfig::new("/tmp/sales.db").max_connections(10);
        assert_eq!(file.max_connections, 10);
        assert!(!file.is_in_memory());

        let memory = DbConfig::in_memory();
        assert!(memory.is_in_memory());
        assert_eq!(memory.max_connections, 1);
    }
}
