//! Hacker News fetcher CLI
//!
//! `serve` runs the stats API and the ingestion schedule until SIGINT or
//! SIGTERM; `ingest` performs a single run.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hn_fetcher::{
    api::{self, AppState},
    config::load_config,
    error::Result,
    models::Config,
    pipeline::{IngestionPipeline, PipelineSettings, Scheduler},
    services::{EventPublisher, HackerNewsClient, NatsPublisher},
    storage::{PgStoryRepository, StoryRepository},
    utils::redact_url,
};
use tokio::sync::watch;

/// hn-fetcher - Hacker News top stories ingestion
#[derive(Parser, Debug)]
#[command(
    name = "hn-fetcher",
    version,
    about = "Stores new Hacker News top stories and announces them on NATS"
)]
struct Cli {
    /// Path to a TOML config file (environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the stats API and ingest on a schedule (default)
    Serve,

    /// Run one ingestion pass and print its summary
    Ingest,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Resolve on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    log::info!("Shutdown signal received");
}

/// Open the database, then the broker. Neither is left open on failure.
async fn connect_backends(
    config: &Config,
) -> Result<(Arc<PgStoryRepository>, Arc<NatsPublisher>)> {
    let repository = Arc::new(PgStoryRepository::connect(&config.database).await?);

    let publisher = match NatsPublisher::connect(&config.broker.url).await {
        Ok(publisher) => Arc::new(publisher),
        Err(e) => {
            repository.close().await;
            return Err(e);
        }
    };

    Ok((repository, publisher))
}

async fn close_backends(repository: &PgStoryRepository, publisher: &NatsPublisher) {
    if let Err(e) = publisher.close().await {
        log::error!("Failed to flush NATS publisher: {e}");
    }
    repository.close().await;
}

async fn serve(config: Config) -> Result<()> {
    let (repository, publisher) = connect_backends(&config).await?;
    let source = Arc::new(HackerNewsClient::new(config.source.clone())?);
    let pipeline = IngestionPipeline::new(
        source,
        repository.clone(),
        publisher.clone(),
        PipelineSettings::from(&config),
    );

    let listener = match api::bind(config.server.port).await {
        Ok(listener) => listener,
        Err(e) => {
            close_backends(&repository, &publisher).await;
            return Err(e);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(api::serve(
        listener,
        AppState::new(repository.clone()),
        shutdown_rx.clone(),
    ));
    let scheduler = Scheduler::new(pipeline, config.schedule.interval());
    let scheduler = tokio::spawn(scheduler.run(shutdown_rx));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    // Scheduler first: it waits for the in-flight run
    match scheduler.await {
        Ok(runs) => log::info!("Completed {runs} ingestion runs"),
        Err(e) => log::error!("Scheduler task failed: {e}"),
    }
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("Stats API failed: {e}"),
        Err(e) => log::error!("Stats API task failed: {e}"),
    }

    close_backends(&repository, &publisher).await;
    Ok(())
}

async fn ingest(config: Config) -> Result<()> {
    let (repository, publisher) = connect_backends(&config).await?;
    let source = Arc::new(HackerNewsClient::new(config.source.clone())?);
    let pipeline = IngestionPipeline::new(
        source,
        repository.clone(),
        publisher.clone(),
        PipelineSettings::from(&config),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let result = pipeline.run(&shutdown_rx).await;
    signal.abort();
    close_backends(&repository, &publisher).await;

    let summary = result?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("hn-fetcher starting...");

    let config = load_config(cli.config.as_deref()).inspect_err(|e| {
        log::error!("Config validation failed: {e}");
    })?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await?,

        Command::Ingest => ingest(config).await?,

        Command::Validate => {
            log::info!("✓ Source: {}", config.source.base_url);
            log::info!("✓ Database: {}", redact_url(&config.database.url));
            log::info!(
                "✓ Broker: {} (subject {})",
                redact_url(&config.broker.url),
                config.broker.subject
            );
            log::info!(
                "✓ Workers: {} (queue {})",
                config.workers.max_workers,
                config.workers.max_capacity
            );
            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}
