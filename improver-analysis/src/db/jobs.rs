//! Analysis job persistence
//!
//! The `analysis_jobs` row is the single source of truth for job state. The
//! orchestrator creates rows at admission, the worker mutates them through
//! [`update_job_status`], and the only delete path is the admission rollback
//! when the credit debit fails after row creation.
//!
//! Ownership scoping is part of every read query (`user_id = ?`), so a job
//! belonging to another user is indistinguishable from an absent one.

use chrono::{DateTime, Duration, Utc};
use improver_common::{Error, Result};
use sqlx::{Row, SqlitePool};

use crate::models::{
    AnalysisOptions, AnalysisScores, Improvement, JobResults, JobStatus, JobStatusView,
    JobSummary, SiteData,
};

/// Fixed admission-time estimate for how long an analysis takes
pub const ESTIMATED_ANALYSIS_TIME_SECS: i64 = 60;

/// Fields that may accompany a status update. `None` leaves the stored value
/// untouched.
#[derive(Debug, Default)]
pub struct JobUpdate {
    pub progress: Option<i64>,
    pub error: Option<String>,
    pub original_site: Option<SiteData>,
    pub improvements: Option<Vec<Improvement>>,
    pub scores: Option<AnalysisScores>,
    pub analysis_time: Option<i64>,
    pub pages_analyzed: Option<i64>,
    pub credits_used: Option<f64>,
}

/// Insert a new job row with status `queued` and progress 0.
///
/// Returns the summary handed back to the client by admission.
pub async fn create_job(
    pool: &SqlitePool,
    job_id: &str,
    user_id: &str,
    url: &str,
    options: &AnalysisOptions,
) -> Result<JobSummary> {
    let now = Utc::now();
    let estimated = now + Duration::seconds(ESTIMATED_ANALYSIS_TIME_SECS);
    let options_json = serde_json::to_string(options)
        .map_err(|e| Error::Internal(format!("Failed to serialize options: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO analysis_jobs (
            id, user_id, url, status, progress, options,
            created_at, updated_at, estimated_completion_time
        ) VALUES (?, ?, ?, 'queued', 0, ?, ?, ?, ?)
        "#,
    )
    .bind(job_id)
    .bind(user_id)
    .bind(url)
    .bind(&options_json)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .bind(estimated.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(JobSummary {
        id: job_id.to_string(),
        status: JobStatus::Queued,
        url: url.to_string(),
        created_at: now,
        estimated_completion_time: estimated,
    })
}

/// Delete a job row (admission rollback only)
pub async fn delete_job(pool: &SqlitePool, job_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM analysis_jobs WHERE id = ?")
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Load the status view for a job, scoped to its owner.
///
/// Returns `None` both when the job does not exist and when it belongs to a
/// different user.
pub async fn get_job_status(
    pool: &SqlitePool,
    job_id: &str,
    user_id: &str,
) -> Result<Option<JobStatusView>> {
    let row = sqlx::query(
        r#"
        SELECT id, status, progress, url, created_at, updated_at,
               completed_at, error, estimated_completion_time
        FROM analysis_jobs
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(job_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(status_view_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Load the full result payload for a job, scoped to its owner.
///
/// The status gate (reject when not `completed`) belongs to the HTTP layer;
/// this accessor returns whatever the row holds.
pub async fn get_job_results(
    pool: &SqlitePool,
    job_id: &str,
    user_id: &str,
) -> Result<Option<JobResults>> {
    let row = sqlx::query(
        r#"
        SELECT id, status, url, created_at, completed_at,
               original_site, improvements,
               seo_score, performance_score, accessibility_score, ux_score,
               analysis_time, pages_analyzed, credits_used
        FROM analysis_jobs
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(job_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    let original_site = row
        .get::<Option<String>, _>("original_site")
        .map(|s| serde_json::from_str::<SiteData>(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize snapshot: {}", e)))?;

    let improvements = row
        .get::<Option<String>, _>("improvements")
        .map(|s| serde_json::from_str::<Vec<Improvement>>(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize improvements: {}", e)))?
        .unwrap_or_default();

    Ok(Some(JobResults {
        id: row.get("id"),
        status: parse_status(&row.get::<String, _>("status"))?,
        url: row.get("url"),
        original_site,
        improvements,
        seo_score: row.get("seo_score"),
        performance_score: row.get("performance_score"),
        accessibility_score: row.get("accessibility_score"),
        ux_score: row.get("ux_score"),
        analysis_time: row.get("analysis_time"),
        pages_analyzed: row.get("pages_analyzed"),
        credits_used: row.get("credits_used"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        completed_at: parse_optional_timestamp(row.get::<Option<String>, _>("completed_at"))?,
    }))
}

/// Apply a status transition plus any accompanying fields.
///
/// `updated_at` is always refreshed. A transition to `completed` forces
/// `progress = 100` and stamps `completed_at` regardless of the update's own
/// progress value. Progress never moves backwards: the stored value wins when
/// it is already higher.
pub async fn update_job_status(
    pool: &SqlitePool,
    job_id: &str,
    status: JobStatus,
    mut updates: JobUpdate,
) -> Result<()> {
    let now = Utc::now();
    let mut completed_at: Option<String> = None;

    if status == JobStatus::Completed {
        updates.progress = Some(100);
        completed_at = Some(now.to_rfc3339());
    }

    let original_site = updates
        .original_site
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to serialize snapshot: {}", e)))?;
    let improvements = updates
        .improvements
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to serialize improvements: {}", e)))?;

    let (seo, performance, accessibility, ux) = match updates.scores {
        Some(scores) => (
            Some(scores.seo as i64),
            Some(scores.performance as i64),
            Some(scores.accessibility as i64),
            Some(scores.ux as i64),
        ),
        None => (None, None, None, None),
    };

    let result = sqlx::query(
        r#"
        UPDATE analysis_jobs SET
            status = ?,
            updated_at = ?,
            progress = COALESCE(MAX(?, progress), progress),
            completed_at = COALESCE(?, completed_at),
            error = COALESCE(?, error),
            original_site = COALESCE(?, original_site),
            improvements = COALESCE(?, improvements),
            seo_score = COALESCE(?, seo_score),
            performance_score = COALESCE(?, performance_score),
            accessibility_score = COALESCE(?, accessibility_score),
            ux_score = COALESCE(?, ux_score),
            analysis_time = COALESCE(?, analysis_time),
            pages_analyzed = COALESCE(?, pages_analyzed),
            credits_used = COALESCE(?, credits_used)
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(now.to_rfc3339())
    .bind(updates.progress)
    .bind(&completed_at)
    .bind(&updates.error)
    .bind(&original_site)
    .bind(&improvements)
    .bind(seo)
    .bind(performance)
    .bind(accessibility)
    .bind(ux)
    .bind(updates.analysis_time)
    .bind(updates.pages_analyzed)
    .bind(updates.credits_used)
    .bind(job_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Analysis job not found: {}", job_id)));
    }

    Ok(())
}

/// Most recent jobs for a user, newest first
pub async fn list_recent_jobs(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<JobStatusView>> {
    let rows = sqlx::query(
        r#"
        SELECT id, status, progress, url, created_at, updated_at,
               completed_at, error, estimated_completion_time
        FROM analysis_jobs
        WHERE user_id = ?
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(status_view_from_row).collect()
}

/// Fail all jobs left in a non-terminal state by a previous process.
///
/// The in-process queue dies with the process, so any `queued` or
/// `processing` row found at startup will never progress.
pub async fn fail_orphaned_jobs(pool: &SqlitePool) -> Result<u64> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE analysis_jobs
        SET status = 'failed',
            error = 'Analysis service restarted before the job finished',
            updated_at = ?
        WHERE status IN ('queued', 'processing')
        "#,
    )
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Fail in-flight jobs whose estimated completion time is more than
/// `grace_secs` in the past. Returns the number of jobs swept.
pub async fn fail_stale_jobs(pool: &SqlitePool, grace_secs: i64) -> Result<u64> {
    let now = Utc::now();
    let cutoff = (now - Duration::seconds(grace_secs)).to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE analysis_jobs
        SET status = 'failed',
            error = 'Analysis exceeded its processing deadline',
            updated_at = ?
        WHERE status IN ('queued', 'processing')
          AND estimated_completion_time < ?
        "#,
    )
    .bind(now.to_rfc3339())
    .bind(&cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

fn status_view_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<JobStatusView> {
    Ok(JobStatusView {
        id: row.get("id"),
        status: parse_status(&row.get::<String, _>("status"))?,
        progress: row.get("progress"),
        url: row.get("url"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
        completed_at: parse_optional_timestamp(row.get::<Option<String>, _>("completed_at"))?,
        error: row.get("error"),
        estimated_completion_time: parse_timestamp(
            &row.get::<String, _>("estimated_completion_time"),
        )?,
    })
}

fn parse_status(value: &str) -> Result<JobStatus> {
    JobStatus::parse(value)
        .ok_or_else(|| Error::Internal(format!("Unknown job status: {}", value)))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp: {}", e)))
}

fn parse_optional_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.map(|s| parse_timestamp(&s)).transpose()
}
