//! Analysis job admission
//!
//! Admission reserves resources before any work happens: the job row is
//! visible in the store if and only if its credit was successfully debited.
//! The debit-after-insert order means a lost balance race is repaired by
//! deleting the just-created row (the compensating action), after which the
//! original debit error propagates to the caller.

use improver_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{jobs, users};
use crate::db::users::PlanTier;
use crate::models::{AnalysisOptions, JobSummary};
use crate::queue::{JobDescriptor, JobPriority, JobQueue};

/// Admit a new analysis job for `user_id`.
///
/// Contract:
/// - Balance below `cost` fails with `InsufficientCredits` before any row or
///   queue entry exists.
/// - A debit failure after row creation deletes the row and propagates.
/// - An enqueue failure is logged and swallowed: the persisted `queued` row
///   is the recovery point of truth and can be re-driven by an operator.
pub async fn create_analysis_job(
    pool: &SqlitePool,
    queue: &dyn JobQueue,
    cost: f64,
    user_id: &str,
    url: &str,
    options: AnalysisOptions,
) -> Result<JobSummary> {
    let user = users::get_user(pool, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User not found: {}", user_id)))?;

    if user.credits < cost {
        return Err(Error::InsufficientCredits(format!(
            "balance {} below required {}",
            user.credits, cost
        )));
    }

    let job_id = Uuid::new_v4().to_string();
    let summary = jobs::create_job(pool, &job_id, user_id, url, &options).await?;

    if let Err(debit_err) = users::debit_credits(pool, user_id, cost).await {
        tracing::warn!(
            job_id = %job_id,
            user_id = %user_id,
            error = %debit_err,
            "Credit debit failed after job creation, rolling back job row"
        );
        if let Err(delete_err) = jobs::delete_job(pool, &job_id).await {
            tracing::error!(
                job_id = %job_id,
                error = %delete_err,
                "Failed to roll back job row after debit failure"
            );
        }
        return Err(debit_err);
    }

    let priority = if user.plan == PlanTier::Pro {
        JobPriority::High
    } else {
        JobPriority::Normal
    };

    let descriptor = JobDescriptor {
        job_id: job_id.clone(),
        user_id: user_id.to_string(),
        url: url.to_string(),
        options,
        priority,
    };

    if let Err(e) = queue.enqueue(descriptor) {
        // No rollback: the queued row in the store is the recovery point
        tracing::error!(
            job_id = %job_id,
            error = %e,
            "Failed to enqueue analysis job; job remains queued in store"
        );
    }

    tracing::info!(
        job_id = %job_id,
        user_id = %user_id,
        url = %url,
        "Analysis job admitted"
    );

    Ok(summary)
}
