//! Analysis job lifecycle types
//!
//! A job progresses through a small status lifecycle:
//! queued → processing → {completed, failed}
//!
//! The database row is the single source of truth for job state; these types
//! are the typed views the service and API layers work with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Improvement, SiteData};

/// Analysis job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Admitted and waiting for a worker
    Queued,
    /// Claimed by a worker, pipeline in flight
    Processing,
    /// Pipeline finished, results attached
    Completed,
    /// Pipeline aborted, error message attached
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-job feature toggles, supplied by the client at admission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    pub include_screenshots: bool,
    pub mobile_analysis: bool,
    pub performance_analysis: bool,
    pub seo_analysis: bool,
    pub accessibility_analysis: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_screenshots: true,
            mobile_analysis: true,
            performance_analysis: true,
            seo_analysis: true,
            accessibility_analysis: true,
        }
    }
}

/// The four per-dimension quality scores, each in [0, 100]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnalysisScores {
    pub seo: u32,
    pub performance: u32,
    pub accessibility: u32,
    pub ux: u32,
}

/// Job summary returned by admission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub status: JobStatus,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub estimated_completion_time: DateTime<Utc>,
}

/// Job status view returned by the polling endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub id: String,
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

/// Full job result payload, populated once the job completes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResults {
    pub id: String,
    pub status: JobStatus,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_site: Option<SiteData>,
    pub improvements: Vec<Improvement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ux_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_analyzed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_used: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
