//! Configuration for the analysis service
//!
//! Settings resolve with CLI > environment > TOML file > compiled default
//! priority. Secrets (scraper and AI keys) are normally supplied through the
//! environment; everything else has a workable default so the service starts
//! with an empty config file.

use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable overriding the database path
pub const ENV_DATABASE_PATH: &str = "IMPROVER_DATABASE_PATH";
/// Environment variable for the scraping backend API key
pub const ENV_SCRAPER_API_KEY: &str = "IMPROVER_SCRAPER_API_KEY";
/// Environment variable for the AI backend API key
pub const ENV_AI_API_KEY: &str = "IMPROVER_AI_API_KEY";

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scraper: ScraperConfig,
    pub ai: AiConfig,
    pub credits: CreditConfig,
    pub rate_limits: RateLimitConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5810,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Explicit database file path; falls back to the shared data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3002".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CreditConfig {
    /// Credits debited per admitted analysis job
    pub analysis_cost: f64,
    /// Starting balance for newly provisioned free-plan accounts
    pub free_allocation: f64,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            analysis_cost: 1.0,
            free_allocation: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Analysis creations admitted per user per window
    pub analysis_per_window: u32,
    /// Accessibility checks admitted per source IP per window
    pub url_check_per_window: u32,
    /// Window length in seconds
    pub window_secs: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            analysis_per_window: 5,
            url_check_per_window: 10,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Run the worker pool in this process
    pub enabled: bool,
    /// Simultaneous in-flight jobs
    pub concurrency: usize,
    /// Throughput cap: job claims per minute
    pub jobs_per_minute: u32,
    /// Grace period past the estimated completion time before the watchdog
    /// fails a stuck job
    pub watchdog_grace_secs: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: 5,
            jobs_per_minute: 10,
            watchdog_grace_secs: 600,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an optional TOML file and apply environment
    /// overrides for secrets.
    pub fn load(path: Option<&std::path::Path>) -> improver_common::Result<Self> {
        let mut config: ServiceConfig = match path {
            Some(path) => improver_common::config::load_toml_file(path)?,
            None => match improver_common::config::default_config_path("analysis") {
                Some(path) => improver_common::config::load_toml_file(&path)?,
                None => ServiceConfig::default(),
            },
        };

        if let Ok(key) = std::env::var(ENV_SCRAPER_API_KEY) {
            config.scraper.api_key = key;
        }
        if let Ok(key) = std::env::var(ENV_AI_API_KEY) {
            config.ai.api_key = key;
        }

        Ok(config)
    }
}
