//! Database access for the analysis service
//!
//! The service shares one SQLite database across instances; this module
//! creates the tables it owns. Timestamps are stored as RFC 3339 TEXT,
//! JSON payloads as serialized TEXT columns.

pub mod jobs;
pub mod rate_limit;
pub mod users;

use improver_common::Result;
use sqlx::SqlitePool;

/// Create the analysis-service tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL DEFAULT '',
            plan TEXT NOT NULL DEFAULT 'free',
            credits REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_jobs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            url TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            progress INTEGER NOT NULL DEFAULT 0,
            options TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT,
            error TEXT,
            estimated_completion_time TEXT NOT NULL,
            original_site TEXT,
            improvements TEXT,
            seo_score INTEGER,
            performance_score INTEGER,
            accessibility_score INTEGER,
            ux_score INTEGER,
            analysis_time INTEGER,
            pages_analyzed INTEGER,
            credits_used REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_analysis_jobs_user_created
         ON analysis_jobs (user_id, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rate_limits (
            key TEXT PRIMARY KEY,
            window_start INTEGER NOT NULL,
            count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
