//! improver-analysis - Website analysis microservice
//!
//! Admits credit-gated analysis jobs over HTTP, processes them
//! asynchronously through a worker pool (scrape → snapshot → AI advice →
//! scoring → improvements), and serves job status and results to polling
//! clients. The shared SQLite database is the source of truth for job
//! state, credit balances and rate-limit counters.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod queue;
pub mod services;
pub mod validate;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::queue::JobQueue;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Service configuration
    pub config: Arc<ServiceConfig>,
    /// Admission half of the job queue
    pub queue: Arc<dyn JobQueue>,
    /// Outbound HTTP client for the accessibility pre-check
    pub http: reqwest::Client,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Arc<ServiceConfig>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            db,
            config,
            queue,
            http: reqwest::Client::new(),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analyze_routes())
        .merge(api::url_check_routes())
        .merge(api::health_routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
