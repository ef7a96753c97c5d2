//! improver-analysis - Website analysis microservice
//!
//! Serves the analysis API and, unless disabled, runs the worker pool that
//! processes queued jobs in the same process. Workers can instead run in a
//! dedicated process pointed at the same database.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use improver_analysis::config::{ServiceConfig, ENV_DATABASE_PATH};
use improver_analysis::queue::{worker, TokioJobQueue};
use improver_analysis::services::orchestrator::WorkerContext;
use improver_analysis::services::{AiAdvisor, ScrapeClient};
use improver_analysis::AppState;

#[derive(Debug, Parser)]
#[command(name = "improver-analysis", about = "Website analysis microservice")]
struct Args {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database file path (overrides config and environment)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Listen port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Serve the API without running the worker pool in this process
    #[arg(long)]
    no_worker: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Starting improver-analysis microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = ServiceConfig::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_worker {
        config.worker.enabled = false;
    }

    let db_path = improver_common::config::resolve_database_path(
        args.database,
        ENV_DATABASE_PATH,
        config.database.path.clone(),
    );
    info!("Database: {}", db_path.display());

    let db_pool = improver_common::db::init_database_pool(&db_path).await?;
    improver_analysis::db::init_tables(&db_pool).await?;
    info!("Database connection established");

    // Jobs left in flight by a previous process will never progress: the
    // in-process queue died with it
    let orphaned = improver_analysis::db::jobs::fail_orphaned_jobs(&db_pool).await?;
    if orphaned > 0 {
        info!(orphaned, "Failed orphaned jobs from previous run");
    }

    let (queue, receiver) = TokioJobQueue::new();
    let config = Arc::new(config);
    let state = AppState::new(db_pool.clone(), Arc::clone(&config), Arc::new(queue));

    if config.worker.enabled {
        let scraper = ScrapeClient::new(&config.scraper)
            .map_err(|e| anyhow::anyhow!("Failed to create scrape client: {}", e))?;
        let advisor = AiAdvisor::new(&config.ai)
            .map_err(|e| anyhow::anyhow!("Failed to create AI advisor: {}", e))?;

        let ctx = Arc::new(WorkerContext {
            db: db_pool.clone(),
            scraper,
            advisor,
            analysis_cost: config.credits.analysis_cost,
        });

        let worker_config = config.worker.clone();
        let _pool_task = tokio::spawn(worker::run_worker_pool(ctx, receiver, worker_config));
        let _watchdog = worker::spawn_watchdog(db_pool.clone(), config.worker.watchdog_grace_secs);
        info!("Worker pool and watchdog started");
    } else {
        info!("Worker pool disabled; this instance only serves the API");
        drop(receiver);
    }

    let app = improver_analysis::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
