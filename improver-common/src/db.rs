//! Shared database pool initialization
//!
//! All Improver services connect to the same SQLite database file, which is
//! what makes the credit ledger and rate-limit counters consistent across
//! serving instances. Service-specific tables are created by each service's
//! own `db` module after the pool is established.

use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize a database connection pool for the given file path.
///
/// Creates the parent directory when missing and opens the database in
/// read-write-create mode.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    Ok(pool)
}

/// Initialize an in-memory database pool for tests.
///
/// Limited to a single connection so every query sees the same in-memory
/// database instance.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}
