//! HTTP boundary integration tests
//!
//! Drives the router directly with `tower::ServiceExt::oneshot` against an
//! in-memory database: auth gating, validation messages, credit gating,
//! rate limiting, and the status/results contracts.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use improver_analysis::config::ServiceConfig;
use improver_analysis::db::users::PlanTier;
use improver_analysis::db::{jobs, users};
use improver_analysis::models::{AnalysisOptions, JobStatus};
use improver_analysis::queue::{JobReceiver, TokioJobQueue};
use improver_analysis::services::analysis::create_analysis_job;
use improver_analysis::AppState;
use sqlx::SqlitePool;

struct TestApp {
    router: Router,
    pool: SqlitePool,
    _receiver: JobReceiver,
}

async fn spawn_app() -> TestApp {
    let pool = improver_common::db::init_memory_pool().await.unwrap();
    improver_analysis::db::init_tables(&pool).await.unwrap();
    let (queue, receiver) = TokioJobQueue::new();
    let state = AppState::new(
        pool.clone(),
        Arc::new(ServiceConfig::default()),
        Arc::new(queue),
    );
    TestApp {
        router: improver_analysis::build_router(state),
        pool,
        _receiver: receiver,
    }
}

fn post_analyze(token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/analyze")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_with_auth(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn analyze_requires_authentication() {
    let app = spawn_app().await;

    let response = app
        .router
        .oneshot(post_analyze(None, json!({"url": "https://example.com"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(error_code(&body), "UNAUTHORIZED");
}

#[tokio::test]
async fn analyze_rejects_non_http_schemes() {
    let app = spawn_app().await;
    users::create_user(&app.pool, "user_1", "a@example.com", PlanTier::Free, 5.0)
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(post_analyze(
            Some("user_1"),
            json!({"url": "ftp://example.com"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
    assert!(error_message(&body).contains("URL must use HTTP or HTTPS protocol"));
}

#[tokio::test]
async fn analyze_rejects_private_network_urls() {
    let app = spawn_app().await;
    users::create_user(&app.pool, "user_1", "a@example.com", PlanTier::Free, 5.0)
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(post_analyze(
            Some("user_1"),
            json!({"url": "http://192.168.1.1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(error_message(&body).contains("Cannot analyze local or private network URLs"));
}

#[tokio::test]
async fn analyze_with_no_credits_returns_payment_required() {
    let app = spawn_app().await;
    users::create_user(&app.pool, "user_1", "a@example.com", PlanTier::Free, 0.0)
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(post_analyze(
            Some("user_1"),
            json!({"url": "https://example.com"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = body_json(response).await;
    assert_eq!(error_code(&body), "INSUFFICIENT_CREDITS");
}

#[tokio::test]
async fn analyze_returns_a_job_summary() {
    let app = spawn_app().await;
    users::create_user(&app.pool, "user_1", "a@example.com", PlanTier::Free, 5.0)
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(post_analyze(
            Some("user_1"),
            json!({
                "url": "https://example.com",
                "options": {"includeScreenshots": false}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "queued");
    assert_eq!(body["url"], "https://example.com");
    assert!(body["jobId"].as_str().is_some());
    assert!(body["createdAt"].as_str().is_some());
    assert!(body["estimatedCompletionTime"].as_str().is_some());

    assert_eq!(users::get_credits(&app.pool, "user_1").await.unwrap(), 4.0);
}

#[tokio::test]
async fn analyze_is_rate_limited_per_user() {
    let app = spawn_app().await;
    users::create_user(&app.pool, "user_1", "a@example.com", PlanTier::Free, 100.0)
        .await
        .unwrap();
    users::create_user(&app.pool, "user_2", "b@example.com", PlanTier::Free, 100.0)
        .await
        .unwrap();

    for _ in 0..5 {
        let response = app
            .router
            .clone()
            .oneshot(post_analyze(
                Some("user_1"),
                json!({"url": "https://example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .router
        .clone()
        .oneshot(post_analyze(
            Some("user_1"),
            json!({"url": "https://example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(error_code(&body), "RATE_LIMIT_EXCEEDED");

    // Another user is unaffected
    let response = app
        .router
        .oneshot(post_analyze(
            Some("user_2"),
            json!({"url": "https://example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_rejects_malformed_job_ids() {
    let app = spawn_app().await;

    let response = app
        .router
        .oneshot(get_with_auth("/api/v1/analyze/not-a-uuid", "user_1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(error_code(&body), "INVALID_JOB_ID");
}

#[tokio::test]
async fn status_is_not_found_for_absent_and_foreign_jobs() {
    let app = spawn_app().await;
    users::create_user(&app.pool, "owner", "o@example.com", PlanTier::Free, 5.0)
        .await
        .unwrap();
    let (queue, _rx) = TokioJobQueue::new();
    let summary = create_analysis_job(
        &app.pool,
        &queue,
        1.0,
        "owner",
        "https://example.com",
        AnalysisOptions::default(),
    )
    .await
    .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get_with_auth(
            "/api/v1/analyze/00000000-0000-0000-0000-000000000000",
            "owner",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .oneshot(get_with_auth(
            &format!("/api/v1/analyze/{}", summary.id),
            "someone_else",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(error_code(&body), "JOB_NOT_FOUND");
}

#[tokio::test]
async fn status_reports_progress_for_the_owner() {
    let app = spawn_app().await;
    users::create_user(&app.pool, "owner", "o@example.com", PlanTier::Free, 5.0)
        .await
        .unwrap();
    let (queue, _rx) = TokioJobQueue::new();
    let summary = create_analysis_job(
        &app.pool,
        &queue,
        1.0,
        "owner",
        "https://example.com",
        AnalysisOptions::default(),
    )
    .await
    .unwrap();

    let response = app
        .router
        .oneshot(get_with_auth(
            &format!("/api/v1/analyze/{}", summary.id),
            "owner",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["jobId"], summary.id.as_str());
    assert_eq!(body["status"], "queued");
    assert_eq!(body["progress"], 0);
}

#[tokio::test]
async fn results_before_completion_conflict() {
    let app = spawn_app().await;
    users::create_user(&app.pool, "owner", "o@example.com", PlanTier::Free, 5.0)
        .await
        .unwrap();
    let (queue, _rx) = TokioJobQueue::new();
    let summary = create_analysis_job(
        &app.pool,
        &queue,
        1.0,
        "owner",
        "https://example.com",
        AnalysisOptions::default(),
    )
    .await
    .unwrap();

    jobs::update_job_status(
        &app.pool,
        &summary.id,
        JobStatus::Processing,
        jobs::JobUpdate {
            progress: Some(30),
            ..jobs::JobUpdate::default()
        },
    )
    .await
    .unwrap();

    let response = app
        .router
        .oneshot(get_with_auth(
            &format!("/api/v1/analyze/{}/results", summary.id),
            "owner",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(error_code(&body), "ANALYSIS_NOT_COMPLETE");
    assert!(error_message(&body).contains("Analysis is processing"));
}

#[tokio::test]
async fn completed_results_include_scores_and_metadata() {
    let app = spawn_app().await;
    users::create_user(&app.pool, "owner", "o@example.com", PlanTier::Free, 5.0)
        .await
        .unwrap();
    let (queue, _rx) = TokioJobQueue::new();
    let summary = create_analysis_job(
        &app.pool,
        &queue,
        1.0,
        "owner",
        "https://example.com",
        AnalysisOptions::default(),
    )
    .await
    .unwrap();

    jobs::update_job_status(
        &app.pool,
        &summary.id,
        JobStatus::Completed,
        jobs::JobUpdate {
            scores: Some(improver_analysis::models::AnalysisScores {
                seo: 72,
                performance: 85,
                accessibility: 64,
                ux: 90,
            }),
            analysis_time: Some(4200),
            pages_analyzed: Some(3),
            credits_used: Some(1.0),
            ..jobs::JobUpdate::default()
        },
    )
    .await
    .unwrap();

    let response = app
        .router
        .oneshot(get_with_auth(
            &format!("/api/v1/analyze/{}/results", summary.id),
            "owner",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["scores"]["seo"], 72);
    assert_eq!(body["scores"]["ux"], 90);
    assert_eq!(body["metadata"]["analysisTime"], 4200);
    assert_eq!(body["metadata"]["pagesAnalyzed"], 3);
    assert_eq!(body["metadata"]["creditsUsed"], 1.0);
}

#[tokio::test]
async fn listing_returns_the_callers_recent_jobs() {
    let app = spawn_app().await;
    users::create_user(&app.pool, "owner", "o@example.com", PlanTier::Free, 10.0)
        .await
        .unwrap();
    let (queue, _rx) = TokioJobQueue::new();
    for i in 0..3 {
        create_analysis_job(
            &app.pool,
            &queue,
            1.0,
            "owner",
            &format!("https://example.com/{}", i),
            AnalysisOptions::default(),
        )
        .await
        .unwrap();
    }

    let response = app
        .router
        .oneshot(get_with_auth("/api/v1/analyze?limit=2", "owner"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["jobs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn url_check_is_unauthenticated_but_validated() {
    let app = spawn_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/url/check-accessibility")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"url": "http://10.0.0.1"}).to_string(),
        ))
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(error_message(&body).contains("Cannot analyze local or private network URLs"));
}

#[tokio::test]
async fn url_check_rejects_out_of_range_timeouts() {
    let app = spawn_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/url/check-accessibility")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"url": "https://example.com", "timeout": 500}).to_string(),
        ))
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn url_check_is_rate_limited_per_ip() {
    let app = spawn_app().await;

    let make_request = || {
        Request::builder()
            .method("POST")
            .uri("/api/v1/url/check-accessibility")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.9")
            // Invalid body: rejected after the rate limit check, so each
            // attempt still consumes window budget without touching the network
            .body(Body::from(json!({"url": "ftp://example.com"}).to_string()))
            .unwrap()
    };

    for _ in 0..10 {
        let response = app.router.clone().oneshot(make_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app.router.oneshot(make_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = spawn_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "improver-analysis");
}
