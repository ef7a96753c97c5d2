//! URL accessibility pre-check
//!
//! POST /api/v1/url/check-accessibility: unauthenticated, rate limited per
//! source IP. Issues a HEAD request so nothing is downloaded and reports
//! whether the target is reachable, with error messages specific enough for
//! the user to act on.

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::db::rate_limit;
use crate::error::{ApiError, ApiResult};
use crate::validate::{validate_analysis_url, validate_check_timeout};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub url: String,
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /api/v1/url/check-accessibility
pub async fn check_accessibility(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> ApiResult<Json<CheckResponse>> {
    let ip = client_ip(&headers, connect_info.as_deref());
    let limits = &state.config.rate_limits;
    let key = format!("url-check:{}", ip);
    let admitted = rate_limit::check_rate_limit(
        &state.db,
        &key,
        limits.url_check_per_window,
        limits.window_secs,
    )
    .await?;
    if !admitted {
        tracing::debug!(ip = %ip, "URL check rate limited");
        return Err(ApiError::RateLimited);
    }

    let Json(request) =
        body.map_err(|e| ApiError::Validation(format!("Invalid request data: {}", e)))?;

    validate_analysis_url(&request.url)?;
    let timeout_ms = validate_check_timeout(request.timeout)?;

    let result = check_url(&state.http, &request.url, timeout_ms).await;
    Ok(Json(result))
}

async fn check_url(client: &reqwest::Client, url: &str, timeout_ms: u64) -> CheckResponse {
    let started = Instant::now();

    let response = client
        .head(url)
        .timeout(Duration::from_millis(timeout_ms))
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.5")
        .send()
        .await;

    let response_time = started.elapsed().as_millis();

    match response {
        Ok(response) => {
            let status = response.status();
            let content_type = header_value(&response, "content-type");
            let server = header_value(&response, "server");

            if status.is_success() || status.is_redirection() {
                return CheckResponse {
                    accessible: true,
                    status_code: Some(status.as_u16()),
                    response_time: Some(response_time),
                    content_type,
                    server,
                    error: None,
                };
            }

            let error = match status.as_u16() {
                403 => "Access forbidden - website blocks automated requests".to_string(),
                404 => "Page not found".to_string(),
                500 => "Server error - website may be temporarily unavailable".to_string(),
                503 => "Service unavailable - website may be under maintenance".to_string(),
                code => format!(
                    "HTTP {} - {}",
                    code,
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            };

            CheckResponse {
                accessible: false,
                status_code: Some(status.as_u16()),
                response_time: Some(response_time),
                content_type: None,
                server: None,
                error: Some(error),
            }
        }
        Err(e) => CheckResponse {
            accessible: false,
            status_code: None,
            response_time: None,
            content_type: None,
            server: None,
            error: Some(describe_request_error(&e, timeout_ms)),
        },
    }
}

/// Map transport-level failures to user-actionable messages
fn describe_request_error(error: &reqwest::Error, timeout_ms: u64) -> String {
    if error.is_timeout() {
        return format!("Request timeout after {} seconds", timeout_ms / 1000);
    }

    let detail = error_chain(error).to_lowercase();

    if detail.contains("dns") || detail.contains("resolve") || detail.contains("not known") {
        return "Domain not found - please check the URL".to_string();
    }
    if detail.contains("refused") {
        return "Connection refused - website may be down".to_string();
    }
    if detail.contains("certificate") || detail.contains("tls") || detail.contains("ssl") {
        return "SSL certificate error - website may have security issues".to_string();
    }

    error.to_string()
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = std::error::Error::source(error);
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// First hop of X-Forwarded-For when present, else the peer address
fn client_ip(headers: &HeaderMap, connect_info: Option<&SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    connect_info
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Build URL check routes
pub fn url_check_routes() -> Router<AppState> {
    Router::new().route("/api/v1/url/check-accessibility", post(check_accessibility))
}
