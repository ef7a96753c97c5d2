//! Worker runtime
//!
//! Pulls job descriptors from the queue and drives them through the
//! processing pipeline with bounded concurrency. A token-bucket rate limiter
//! caps how many jobs are claimed per minute, independent of how fast they
//! finish. The runtime also owns the watchdog that fails jobs stuck past
//! their deadline.

use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::WorkerConfig;
use crate::queue::JobReceiver;
use crate::services::orchestrator::{self, WorkerContext};

/// Run the worker pool until the queue closes.
///
/// At most `config.concurrency` jobs are in flight simultaneously; claims
/// are throttled to `config.jobs_per_minute`.
pub async fn run_worker_pool(
    ctx: Arc<WorkerContext>,
    mut receiver: JobReceiver,
    config: WorkerConfig,
) {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let per_minute = NonZeroU32::new(config.jobs_per_minute).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_minute(per_minute));

    tracing::info!(
        concurrency = config.concurrency,
        jobs_per_minute = config.jobs_per_minute,
        "Worker pool started"
    );

    while let Some(descriptor) = receiver.recv().await {
        limiter.until_ready().await;

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            let _permit = permit;
            orchestrator::process_job(&ctx, descriptor).await;
        });
    }

    tracing::info!("Worker pool stopped: queue closed");
}

/// Spawn the periodic watchdog that fails jobs whose estimated completion
/// time is more than `grace_secs` in the past.
pub fn spawn_watchdog(db: sqlx::SqlitePool, grace_secs: i64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match crate::db::jobs::fail_stale_jobs(&db, grace_secs).await {
                Ok(0) => {}
                Ok(swept) => {
                    tracing::warn!(swept, "Watchdog failed jobs stuck past their deadline")
                }
                Err(e) => tracing::error!(error = %e, "Watchdog sweep failed"),
            }
        }
    })
}
