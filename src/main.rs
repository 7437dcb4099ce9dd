//! Pulse Feeds main entry point
//!
//! This is the command-line interface for the Pulse Feeds refresh service.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use pulse_feeds::config::{load_config_with_hash, Config};
use pulse_feeds::http::build_http_client;
use pulse_feeds::output::{collect_statuses, print_statuses};
use pulse_feeds::{CycleResult, RefreshContext, SourceRegistry};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Pulse Feeds: cached, periodically refreshed content collections
///
/// Pulse Feeds reads syndication feeds, release registries and forums on a
/// per-source schedule, keeping the last good content when upstreams fail.
#[derive(Parser, Debug)]
#[command(name = "pulse-feeds")]
#[command(version)]
#[command(about = "Periodically refreshed feed collections", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Refresh every source once, print a status report and exit
    #[arg(long, conflicts_with = "check")]
    once: bool,

    /// Validate config and list the configured sources without fetching
    #[arg(long, conflicts_with = "once")]
    check: bool,
}

/// Smallest poll interval the service loop accepts
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.check {
        handle_check(&config);
    } else if cli.once {
        handle_once(&config).await?;
    } else {
        handle_serve(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pulse_feeds=info,warn"),
            1 => EnvFilter::new("pulse_feeds=debug,info"),
            2 => EnvFilter::new("pulse_feeds=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --check mode: validates config and lists the sources
fn handle_check(config: &Config) {
    println!("=== Pulse Feeds Configuration ===\n");

    println!("HTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}", config.http.timeout);

    println!("\nRefresh:");
    println!("  Poll interval: {}", config.refresh.poll_interval);

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        match source.title() {
            Some(title) => println!("  - {} ({})", title, source.kind()),
            None => println!("  - {}", source.kind()),
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --once mode: one refresh of every source, then a report
async fn handle_once(config: &Config) -> anyhow::Result<()> {
    let client = build_http_client(&config.http).context("Failed to build HTTP client")?;
    let ctx = RefreshContext::new(client);
    let mut registry = SourceRegistry::from_config(config);

    let results = registry.refresh_due(&ctx, Utc::now()).await;
    let failed = results.iter().filter(|(_, r)| *r == CycleResult::Failed).count();
    tracing::info!(refreshed = results.len(), failed, "Single refresh complete");

    print_statuses(&collect_statuses(&registry));

    Ok(())
}

/// Handles the service loop: refreshes due sources until Ctrl-C
async fn handle_serve(config: &Config) -> anyhow::Result<()> {
    let client = build_http_client(&config.http).context("Failed to build HTTP client")?;
    let cancel = CancellationToken::new();
    let ctx = RefreshContext::new(client).with_cancellation(cancel.clone());
    let mut registry = SourceRegistry::from_config(config);

    tracing::info!(
        sources = registry.len(),
        poll_interval = %config.refresh.poll_interval,
        "Starting refresh loop"
    );

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested, cancelling in-flight fetches");
                shutdown.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let period = config.refresh.poll_interval.to_std().max(MIN_POLL_INTERVAL);
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                registry.refresh_due(&ctx, Utc::now()).await;
            }
        }
    }

    print_statuses(&collect_statuses(&registry));
    tracing::info!("Refresh loop stopped");

    Ok(())
}
