//! Analysis API handlers
//!
//! POST /api/v1/analyze, GET /api/v1/analyze, GET /api/v1/analyze/{job_id},
//! GET /api/v1/analyze/{job_id}/results

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::db::{jobs, rate_limit};
use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisOptions, Improvement, JobStatus, JobStatusView, SiteData};
use crate::services::analysis;
use crate::validate::validate_analysis_url;
use crate::AppState;

/// POST /api/v1/analyze request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,
    #[serde(default)]
    pub options: Option<AnalysisOptions>,
}

/// POST /api/v1/analyze response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub estimated_completion_time: DateTime<Utc>,
}

/// GET /api/v1/analyze/{job_id} response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub estimated_completion_time: DateTime<Utc>,
}

impl From<JobStatusView> for StatusResponse {
    fn from(view: JobStatusView) -> Self {
        Self {
            job_id: view.id,
            status: view.status,
            progress: view.progress,
            url: view.url,
            created_at: view.created_at,
            updated_at: view.updated_at,
            completed_at: view.completed_at,
            error: view.error,
            estimated_completion_time: view.estimated_completion_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScoresPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ux: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_analyzed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_used: Option<f64>,
}

/// GET /api/v1/analyze/{job_id}/results response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_site: Option<SiteData>,
    pub improvements: Vec<Improvement>,
    pub scores: ScoresPayload,
    pub metadata: ResultsMetadata,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/analyze response
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub jobs: Vec<StatusResponse>,
}

/// POST /api/v1/analyze
///
/// Validate, rate-limit and admit a new analysis job. Returns the job
/// summary immediately; the client polls for progress.
pub async fn create_analysis(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let limits = &state.config.rate_limits;
    let key = format!("analysis:{}", user_id);
    let admitted = rate_limit::check_rate_limit(
        &state.db,
        &key,
        limits.analysis_per_window,
        limits.window_secs,
    )
    .await?;
    if !admitted {
        tracing::debug!(user_id = %user_id, "Analysis request rate limited");
        return Err(ApiError::RateLimited);
    }

    let Json(request) =
        body.map_err(|e| ApiError::Validation(format!("Invalid request data: {}", e)))?;

    validate_analysis_url(&request.url)?;

    let summary = analysis::create_analysis_job(
        &state.db,
        state.queue.as_ref(),
        state.config.credits.analysis_cost,
        &user_id,
        &request.url,
        request.options.unwrap_or_default(),
    )
    .await?;

    Ok(Json(AnalyzeResponse {
        job_id: summary.id,
        status: summary.status,
        url: summary.url,
        created_at: summary.created_at,
        estimated_completion_time: summary.estimated_completion_time,
    }))
}

/// GET /api/v1/analyze/{job_id}
///
/// Poll job status. A job that does not exist and a job owned by another
/// user are indistinguishable (both 404).
pub async fn get_analysis_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let job_id = parse_job_id(&job_id)?;

    let view = jobs::get_job_status(&state.db, &job_id, &user_id)
        .await?
        .ok_or(ApiError::JobNotFound)?;

    Ok(Json(view.into()))
}

/// GET /api/v1/analyze/{job_id}/results
///
/// Fetch the completed result payload. Jobs that have not completed are
/// rejected with 409 rather than returning partial data.
pub async fn get_analysis_results(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ResultsResponse>> {
    let job_id = parse_job_id(&job_id)?;

    let results = jobs::get_job_results(&state.db, &job_id, &user_id)
        .await?
        .ok_or(ApiError::ResultsNotFound)?;

    if results.status != JobStatus::Completed {
        return Err(ApiError::NotComplete(results.status.to_string()));
    }

    Ok(Json(ResultsResponse {
        job_id: results.id,
        status: results.status,
        url: results.url,
        original_site: results.original_site,
        improvements: results.improvements,
        scores: ScoresPayload {
            seo: results.seo_score,
            performance: results.performance_score,
            accessibility: results.accessibility_score,
            ux: results.ux_score,
        },
        metadata: ResultsMetadata {
            analysis_time: results.analysis_time,
            pages_analyzed: results.pages_analyzed,
            credits_used: results.credits_used,
        },
        created_at: results.created_at,
        completed_at: results.completed_at,
    }))
}

/// GET /api/v1/analyze
///
/// Most recent jobs for the caller, newest first.
pub async fn list_analyses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    let views = jobs::list_recent_jobs(&state.db, &user_id, limit).await?;

    Ok(Json(ListResponse {
        jobs: views.into_iter().map(StatusResponse::from).collect(),
    }))
}

fn parse_job_id(raw: &str) -> Result<String, ApiError> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| ApiError::InvalidJobId)
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/analyze", post(create_analysis).get(list_analyses))
        .route("/api/v1/analyze/:job_id", get(get_analysis_status))
        .route("/api/v1/analyze/:job_id/results", get(get_analysis_results))
}
