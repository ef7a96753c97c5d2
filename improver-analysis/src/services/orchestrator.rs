//! Worker-side processing pipeline
//!
//! Drives a claimed job through its five checkpointed stages, persisting
//! progress after each: scrape → snapshot → AI advice → scoring →
//! completion. Advisor failures degrade to the rule-based fallback inside
//! the advisor itself; a scrape failure is fatal to the job because no
//! content means no analysis. Any unrecovered error transitions the job to
//! `failed` with the message captured and no partial results attached.

use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Instant;

use crate::db::jobs::{self, JobUpdate};
use crate::models::{
    JobStatus, Screenshot, ScreenshotKind, SiteData, SiteMetadata,
};
use crate::queue::JobDescriptor;
use crate::services::scrape_client::ScrapedPage;
use crate::services::{extractor, scoring, AiAdvisor, ScrapeClient};

/// Shared dependencies of the worker pool
pub struct WorkerContext {
    pub db: SqlitePool,
    pub scraper: ScrapeClient,
    pub advisor: AiAdvisor,
    /// Credits debited per job, recorded into the completed result
    pub analysis_cost: f64,
}

/// Process one claimed job to a terminal state.
///
/// Errors are terminal for the job, not for the worker: the failure is
/// persisted onto the job row and swallowed here. If even the failure write
/// fails, the job is left in its last successfully persisted state and the
/// condition is logged for operators.
pub async fn process_job(ctx: &WorkerContext, descriptor: JobDescriptor) {
    let started = Instant::now();

    tracing::info!(
        job_id = %descriptor.job_id,
        url = %descriptor.url,
        "Processing analysis job"
    );

    match run_pipeline(ctx, &descriptor, started).await {
        Ok(()) => {
            tracing::info!(
                job_id = %descriptor.job_id,
                duration_ms = started.elapsed().as_millis() as i64,
                "Analysis job completed"
            );
        }
        Err(e) => {
            tracing::error!(
                job_id = %descriptor.job_id,
                error = %e,
                "Analysis job failed"
            );

            let update = JobUpdate {
                error: Some(e.to_string()),
                ..JobUpdate::default()
            };
            if let Err(persist_err) =
                jobs::update_job_status(&ctx.db, &descriptor.job_id, JobStatus::Failed, update)
                    .await
            {
                tracing::error!(
                    job_id = %descriptor.job_id,
                    error = %persist_err,
                    "Failed to record job failure; job left in last persisted state"
                );
            }
        }
    }
}

async fn run_pipeline(
    ctx: &WorkerContext,
    descriptor: &JobDescriptor,
    started: Instant,
) -> anyhow::Result<()> {
    let db = &ctx.db;
    let job_id = &descriptor.job_id;
    let options = &descriptor.options;

    // Stage 1: claim
    jobs::update_job_status(db, job_id, JobStatus::Processing, progress(10)).await?;

    // Stage 2: fetch the primary page; failure here is fatal to the job
    let main_page = ctx
        .scraper
        .scrape(&descriptor.url, options.include_screenshots)
        .await?;
    jobs::update_job_status(db, job_id, JobStatus::Processing, progress(30)).await?;

    // Stage 3: optional multi-page crawl; degrades to the single page
    let mut pages = vec![main_page];
    if options.seo_analysis || options.performance_analysis {
        match ctx.scraper.crawl(&descriptor.url).await {
            Ok(crawled) if !crawled.is_empty() => pages = crawled,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    job_id = %job_id,
                    error = %e,
                    "Site crawl failed, analyzing main page only"
                );
            }
        }
    }

    // Stage 4: snapshot + AI advice
    let site = build_site_data(&descriptor.url, &pages[0]);
    let advice = ctx.advisor.analyze(&site).await;
    jobs::update_job_status(db, job_id, JobStatus::Processing, progress(50)).await?;

    // Stage 5: scoring
    let scores = scoring::score_site(
        &site,
        options,
        &advice.seo_recommendations,
        &advice.performance_issues,
        &advice.accessibility_issues,
        &advice.ux_suggestions,
    );
    jobs::update_job_status(db, job_id, JobStatus::Processing, progress(80)).await?;

    // Stage 6: improvements, then terminal persistence
    let improvements = ctx
        .advisor
        .generate_improvements(&site, &scores, options)
        .await;

    let update = JobUpdate {
        original_site: Some(site),
        improvements: Some(improvements),
        scores: Some(scores),
        analysis_time: Some(started.elapsed().as_millis() as i64),
        pages_analyzed: Some(pages.len() as i64),
        credits_used: Some(ctx.analysis_cost),
        ..JobUpdate::default()
    };
    jobs::update_job_status(db, job_id, JobStatus::Completed, update).await?;

    Ok(())
}

fn progress(value: i64) -> JobUpdate {
    JobUpdate {
        progress: Some(value),
        ..JobUpdate::default()
    }
}

/// Assemble the normalized snapshot from one scraped page
pub fn build_site_data(job_url: &str, page: &ScrapedPage) -> SiteData {
    let metadata = &page.metadata;

    let url = if metadata.og_url.is_empty() {
        job_url.to_string()
    } else {
        metadata.og_url.clone()
    };

    let keywords = metadata
        .keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect();

    let mut og_tags = std::collections::HashMap::new();
    for (key, value) in [
        ("og:title", &metadata.og_title),
        ("og:description", &metadata.og_description),
        ("og:image", &metadata.og_image),
        ("og:url", &metadata.og_url),
    ] {
        if !value.is_empty() {
            og_tags.insert(key.to_string(), value.clone());
        }
    }

    let screenshots = page
        .screenshot
        .as_ref()
        .map(|shot| {
            vec![Screenshot {
                kind: ScreenshotKind::Desktop,
                url: shot.clone(),
                width: 1920,
                height: 1080,
                timestamp: Utc::now(),
            }]
        })
        .unwrap_or_default();

    SiteData {
        url,
        title: metadata.title.clone(),
        description: metadata.description.clone(),
        content: page.markdown.clone(),
        structure: extractor::extract_page_structure(&page.html),
        assets: extractor::extract_assets(&page.html),
        metadata: SiteMetadata {
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            keywords,
            og_tags,
            twitter_tags: std::collections::HashMap::new(),
            structured_data: Vec::new(),
        },
        screenshots,
    }
}
