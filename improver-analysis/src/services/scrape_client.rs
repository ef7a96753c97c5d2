//! Scraping backend client
//!
//! Talks to the self-hosted scraping service that fetches a URL and returns
//! raw markup plus page metadata. A scrape failure is fatal to the job (no
//! content means no analysis), while a multi-page crawl failure degrades to
//! the single scraped page.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::config::ScraperConfig;

const USER_AGENT: &str = "Website-Improver-Bot/1.0 (+https://website-improver.com/bot)";

/// Scraping backend errors
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Scrape failed: {0}")]
    Upstream(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One scraped page: raw markup, rendered text and metadata
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapedPage {
    pub content: String,
    pub markdown: String,
    pub html: String,
    pub metadata: ScrapedMetadata,
    pub screenshot: Option<String>,
}

/// Metadata block returned by the scraping backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapedMetadata {
    pub title: String,
    pub description: String,
    pub language: String,
    pub keywords: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: String,
    pub og_url: String,
    pub status_code: Option<u16>,
    /// Any extra metadata fields the backend forwards
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapedPage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawlResponse {
    success: bool,
    data: Option<Vec<ScrapedPage>>,
    error: Option<String>,
}

/// Scraping backend API client
pub struct ScrapeClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ScrapeClient {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Scrape a single page.
    ///
    /// Scripts, styles and chrome are excluded server-side; the screenshot is
    /// only requested when the job asked for one.
    pub async fn scrape(
        &self,
        url: &str,
        include_screenshot: bool,
    ) -> Result<ScrapedPage, ScrapeError> {
        let endpoint = format!("{}/v0/scrape", self.base_url);

        tracing::debug!(url = %url, "Requesting page scrape");

        let response = self
            .http_client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "url": url,
                "formats": ["markdown", "html"],
                "includeTags": ["title", "meta", "h1", "h2", "h3", "p", "a", "img"],
                "excludeTags": ["script", "style", "nav", "footer"],
                "screenshot": include_screenshot,
            }))
            .send()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ScrapeError::Upstream(format!(
                "Scraper returned {}: {}",
                status, detail
            )));
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::Parse(e.to_string()))?;

        if !body.success {
            return Err(ScrapeError::Upstream(
                body.error.unwrap_or_else(|| "Failed to scrape website".to_string()),
            ));
        }

        body.data
            .ok_or_else(|| ScrapeError::Upstream("Failed to scrape website".to_string()))
    }

    /// Crawl the site up to depth 2, at most 10 pages.
    ///
    /// Admin, login and API paths are excluded; screenshots are only ever
    /// taken of the main page.
    pub async fn crawl(&self, url: &str) -> Result<Vec<ScrapedPage>, ScrapeError> {
        let endpoint = format!("{}/v0/crawl", self.base_url);

        tracing::debug!(url = %url, "Requesting site crawl");

        let response = self
            .http_client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "url": url,
                "crawlerOptions": {
                    "includes": [],
                    "excludes": ["*/admin/*", "*/login/*", "*/api/*"],
                    "maxDepth": 2,
                    "limit": 10,
                },
                "pageOptions": {
                    "formats": ["markdown", "html"],
                    "includeTags": ["title", "meta", "h1", "h2", "h3", "p", "a", "img"],
                    "excludeTags": ["script", "style", "nav", "footer"],
                    "screenshot": false,
                },
            }))
            .send()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ScrapeError::Upstream(format!(
                "Scraper returned {}: {}",
                status, detail
            )));
        }

        let body: CrawlResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::Parse(e.to_string()))?;

        if !body.success {
            return Err(ScrapeError::Upstream(
                body.error.unwrap_or_else(|| "Failed to crawl website".to_string()),
            ));
        }

        body.data
            .ok_or_else(|| ScrapeError::Upstream("Failed to crawl website".to_string()))
    }
}
