//! Schema migrations.
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary, so a
//! fresh install needs nothing on disk besides the database file. sqlx keeps
//! the list of applied scripts in `_sqlx_migrations` and only runs the ones
//! it has not seen, each in its own transaction.
//!
//! Scripts are append-only: change the schema with a new `NNN_name.sql`
//! file rather than editing one that may already be applied somewhere.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(known = MIGRATOR.migrations.len(), "Migrations applied");
    Ok(())
}

/// `(known, applied)` script counts. A store that was never migrated
/// reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
