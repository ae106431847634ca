//! JobFeed Ingest - job posting ingestion tool

use anyhow::Result;
use clap::{Parser, Subcommand};
use jobfeed_common::logging::{init_logging, LogConfig, LogLevel};
use jobfeed_ingest::{
    build_adapter, run_scheduled, HttpFetcher, IngestConfig, InMemoryJobStore, JobStore,
    RetryExecutor, RunCoordinator, RunStats,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "jobfeed-ingest")]
#[command(author, version, about = "JobFeed job posting ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every source once and exit
    Run,

    /// Run at startup and then periodically until Ctrl-C
    Schedule {
        /// Seconds between run starts (overrides JOBFEED_RUN_INTERVAL_SECS)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Show the configured sources
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("jobfeed-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = IngestConfig::from_env()?;

    match cli.command {
        Command::Sources => {
            for (position, source) in config.sources.iter().enumerate() {
                info!(
                    position = position + 1,
                    name = %source.name,
                    endpoint = %source.endpoint,
                    format = source.format.label(),
                    base_url = %source.base_url,
                    "Configured source"
                );
            }
        },
        Command::Run => {
            let shutdown = shutdown_on_ctrl_c();
            let coordinator = build_coordinator(&config, shutdown).await?;
            let stats = coordinator.run_once().await;
            log_stats(&stats);
        },
        Command::Schedule { interval_secs } => {
            let interval = interval_secs
                .map(Duration::from_secs)
                .unwrap_or(config.run_interval);
            if interval.is_zero() {
                anyhow::bail!("Interval must be greater than 0");
            }

            let shutdown = shutdown_on_ctrl_c();
            let coordinator = build_coordinator(&config, shutdown.clone()).await?;
            let runs = run_scheduled(Arc::new(coordinator), interval, shutdown).await;
            info!(runs, "Scheduler exited");
        },
    }

    Ok(())
}

async fn build_coordinator(
    config: &IngestConfig,
    cancel: CancellationToken,
) -> Result<RunCoordinator> {
    let fetcher = HttpFetcher::new(&config.http)?;
    let adapters = config
        .sources
        .iter()
        .cloned()
        .map(|source| build_adapter(source, fetcher.clone()))
        .collect();

    let store = open_store(config).await?;
    let executor = RetryExecutor::new(config.retry, cancel);

    Ok(RunCoordinator::new(adapters, store, executor))
}

#[cfg(feature = "database")]
async fn open_store(config: &IngestConfig) -> Result<Arc<dyn JobStore>> {
    use jobfeed_ingest::PgJobStore;

    match &config.database.url {
        Some(url) => {
            let store = PgJobStore::connect(url, config.database.max_connections).await?;
            store.migrate().await?;
            info!("Using PostgreSQL job store");
            Ok(Arc::new(store))
        },
        None => Ok(in_memory_store()),
    }
}

#[cfg(not(feature = "database"))]
async fn open_store(config: &IngestConfig) -> Result<Arc<dyn JobStore>> {
    if config.database.url.is_some() {
        warn!("DATABASE_URL is set but this build has no database support");
    }
    Ok(in_memory_store())
}

fn in_memory_store() -> Arc<dyn JobStore> {
    warn!("Using in-memory job store; postings are lost on exit");
    Arc::new(InMemoryJobStore::new())
}

/// Token cancelled on the first Ctrl-C
fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Shutdown requested");
        trigger.cancel();
    });
    token
}

fn log_stats(stats: &RunStats) {
    for report in &stats.sources {
        info!(
            source = %report.name,
            status = ?report.status,
            attempts = report.attempts,
            new_jobs = report.tally.new_jobs,
            duplicates = report.tally.duplicates,
            rejected = report.tally.rejected,
            malformed = report.tally.malformed,
            store_failures = report.tally.store_failures,
            "Source summary"
        );
    }
    info!(
        run_id = %stats.run_id,
        new_jobs = stats.new_jobs_total,
        "Ingestion complete"
    );
}
