//! User account and credit ledger operations
//!
//! The `users` row is the authoritative balance store. Every debit happens
//! through a single conditional UPDATE so that concurrent debits against the
//! same account serialize in the database: when only one unit of balance
//! remains, two simultaneous admissions cannot both succeed.

use chrono::{DateTime, Utc};
use improver_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Subscription tier; pro accounts get priority queue placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(PlanTier::Free),
            "pro" => Some(PlanTier::Pro),
            _ => None,
        }
    }
}

/// User account record
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub plan: PlanTier,
    pub credits: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provision a user account (driven by the external identity event)
pub async fn create_user(
    pool: &SqlitePool,
    user_id: &str,
    email: &str,
    plan: PlanTier,
    starting_credits: f64,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, plan, credits, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(plan.as_str())
    .bind(starting_credits)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user_id, plan = plan.as_str(), "User account provisioned");
    Ok(())
}

/// Load a user account
pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<Option<UserAccount>> {
    let row = sqlx::query(
        "SELECT id, email, plan, credits, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let plan: String = row.get("plan");
            let plan = PlanTier::parse(&plan)
                .ok_or_else(|| Error::Internal(format!("Unknown plan tier: {}", plan)))?;

            Ok(Some(UserAccount {
                id: row.get("id"),
                email: row.get("email"),
                plan,
                credits: row.get("credits"),
                created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
                updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
            }))
        }
        None => Ok(None),
    }
}

/// Current credit balance; fails with NotFound when the account is absent
pub async fn get_credits(pool: &SqlitePool, user_id: &str) -> Result<f64> {
    let credits: Option<f64> = sqlx::query_scalar("SELECT credits FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    credits.ok_or_else(|| Error::NotFound(format!("User not found: {}", user_id)))
}

/// Whether the account holds at least `amount` credits.
///
/// A missing account answers `false`, not an error.
pub async fn has_credits(pool: &SqlitePool, user_id: &str, amount: f64) -> Result<bool> {
    match get_credits(pool, user_id).await {
        Ok(balance) => Ok(balance >= amount),
        Err(Error::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Atomically debit `amount` credits and return the new balance.
///
/// The balance check and decrement are one conditional UPDATE; losing a race
/// surfaces as `InsufficientCredits` exactly like an upfront shortfall.
pub async fn debit_credits(pool: &SqlitePool, user_id: &str, amount: f64) -> Result<f64> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        "UPDATE users SET credits = credits - ?, updated_at = ? WHERE id = ? AND credits >= ?",
    )
    .bind(amount)
    .bind(&now)
    .bind(user_id)
    .bind(amount)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Distinguish a missing account from a shortfall
        let balance = get_credits(pool, user_id).await?;
        return Err(Error::InsufficientCredits(format!(
            "balance {} below required {}",
            balance, amount
        )));
    }

    let balance = get_credits(pool, user_id).await?;
    tracing::info!(user_id = %user_id, amount, balance, "Credits debited");
    Ok(balance)
}

/// Unconditionally add credits (top-ups and operator refunds) and return the
/// new balance.
pub async fn add_credits(pool: &SqlitePool, user_id: &str, amount: f64) -> Result<f64> {
    let now = Utc::now().to_rfc3339();

    let result =
        sqlx::query("UPDATE users SET credits = credits + ?, updated_at = ? WHERE id = ?")
            .bind(amount)
            .bind(&now)
            .bind(user_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User not found: {}", user_id)));
    }

    let balance = get_credits(pool, user_id).await?;
    tracing::info!(user_id = %user_id, amount, balance, "Credits added");
    Ok(balance)
}

/// Change the account's plan tier
pub async fn set_plan(pool: &SqlitePool, user_id: &str, plan: PlanTier) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query("UPDATE users SET plan = ?, updated_at = ? WHERE id = ?")
        .bind(plan.as_str())
        .bind(&now)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User not found: {}", user_id)));
    }

    Ok(())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp: {}", e)))
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
    async fn missing_account_reports_not_found() {
        let pool = test_pool().await;
        assert!(matches!(
            get_credits(&pool, "nobody").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn has_credits_answers_false_for_missing_account() {
        let pool = test_pool().await;
        assert!(!has_credits(&pool, "nobody", 1.0).await.unwrap());
    }

    #[tokio::test]
    async fn debit_decrements_and_returns_new_balance() {
        let pool = test_pool().await;
        create_user(&pool, "user_1", "a@example.com", PlanTier::Free, 5.0)
            .await
            .unwrap();

        let balance = debit_credits(&pool, "user_1", 1.0).await.unwrap();
        assert_eq!(balance, 4.0);
        assert_eq!(get_credits(&pool, "user_1").await.unwrap(), 4.0);
    }

    #[tokio::test]
    async fn debit_below_balance_is_rejected_without_mutation() {
        let pool = test_pool().await;
        create_user(&pool, "user_1", "a@example.com", PlanTier::Free, 0.5)
            .await
            .unwrap();

        let result = debit_credits(&pool, "user_1", 1.0).await;
        assert!(matches!(result, Err(Error::InsufficientCredits(_))));
        assert_eq!(get_credits(&pool, "user_1").await.unwrap(), 0.5);
    }

    #[tokio::test]
    async fn fractional_balances_are_supported() {
        let pool = test_pool().await;
        create_user(&pool, "user_1", "a@example.com", PlanTier::Free, 5.0)
            .await
            .unwrap();

        let balance = debit_credits(&pool, "user_1", 2.5).await.unwrap();
        assert_eq!(balance, 2.5);
    }

    #[tokio::test]
    async fn add_credits_increments_unconditionally() {
        let pool = test_pool().await;
        create_user(&pool, "user_1", "a@example.com", PlanTier::Free, 0.0)
            .await
            .unwrap();

        let balance = add_credits(&pool, "user_1", 10.0).await.unwrap();
        assert_eq!(balance, 10.0);
    }

    #[tokio::test]
    async fn plan_upgrade_persists() {
        let pool = test_pool().await;
        create_user(&pool, "user_1", "a@example.com", PlanTier::Free, 5.0)
            .await
            .unwrap();

        set_plan(&pool, "user_1", PlanTier::Pro).await.unwrap();
        let user = get_user(&pool, "user_1").await.unwrap().unwrap();
        assert_eq!(user.plan, PlanTier::Pro);
    }
}
