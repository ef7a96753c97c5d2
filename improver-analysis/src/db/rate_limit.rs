//! Fixed-window rate limiting backed by the shared database
//!
//! Counters live in the `rate_limits` table rather than an in-process map,
//! so the limit holds across every serving instance that shares the
//! database. Each admission is one of three atomic statements: first use of
//! a key, reset of an expired window, or increment within the live window.

use chrono::Utc;
use improver_common::Result;
use sqlx::SqlitePool;

/// Try to admit one request for `key` under a fixed window of
/// `window_secs` seconds with at most `max` admissions per window.
///
/// Returns `true` when the request is admitted.
pub async fn check_rate_limit(
    pool: &SqlitePool,
    key: &str,
    max: u32,
    window_secs: u32,
) -> Result<bool> {
    let now = Utc::now().timestamp();
    let cutoff = now - window_secs as i64;

    // First use of this key
    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO rate_limits (key, window_start, count) VALUES (?, ?, 1)",
    )
    .bind(key)
    .bind(now)
    .execute(pool)
    .await?;
    if inserted.rows_affected() == 1 {
        return Ok(true);
    }

    // Window expired: start a fresh one
    let reset = sqlx::query(
        "UPDATE rate_limits SET window_start = ?, count = 1 WHERE key = ? AND window_start <= ?",
    )
    .bind(now)
    .bind(key)
    .bind(cutoff)
    .execute(pool)
    .await?;
    if reset.rows_affected() == 1 {
        return Ok(true);
    }

    // Live window: admit while below the cap
    let incremented = sqlx::query(
        "UPDATE rate_limits SET count = count + 1
         WHERE key = ? AND window_start > ? AND count < ?",
    )
    .bind(key)
    .bind(cutoff)
    .bind(max)
    .execute(pool)
    .await?;

    Ok(incremented.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = improver_common::db::init_memory_pool().await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn admits_up_to_the_cap_then_denies() {
        let pool = test_pool().await;

        for _ in 0..5 {
            assert!(check_rate_limit(&pool, "analysis:user_1", 5, 60)
                .await
                .unwrap());
        }
        assert!(!check_rate_limit(&pool, "analysis:user_1", 5, 60)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let pool = test_pool().await;

        for _ in 0..5 {
            assert!(check_rate_limit(&pool, "analysis:user_1", 5, 60)
                .await
                .unwrap());
        }
        assert!(check_rate_limit(&pool, "analysis:user_2", 5, 60)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn expired_window_resets_the_counter() {
        let pool = test_pool().await;

        for _ in 0..5 {
            assert!(check_rate_limit(&pool, "url-check:1.2.3.4", 5, 60)
                .await
                .unwrap());
        }
        assert!(!check_rate_limit(&pool, "url-check:1.2.3.4", 5, 60)
            .await
            .unwrap());

        // Age the window past the cutoff
        let old = Utc::now().timestamp() - 120;
        sqlx::query("UPDATE rate_limits SET window_start = ? WHERE key = ?")
            .bind(old)
            .bind("url-check:1.2.3.4")
            .execute(&pool)
            .await
            .unwrap();

        assert!(check_rate_limit(&pool, "url-check:1.2.3.4", 5, 60)
            .await
            .unwrap());
    }
}
