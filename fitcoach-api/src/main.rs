//! fitcoach-api - FitCoach backend service
//!
//! `serve` (default) runs the HTTP API. `backfill` brings every evaluation up
//! to date with the fact records already stored and exits.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fitcoach_common::config::{CliOverrides, CoachConfig};
use fitcoach_common::db::init_database;
use fitcoach_common::events::EventBus;
use fitcoach_common::relationships::ActiveRelationshipPolicy;
use fitcoach_common::sync::backfill;
use fitcoach_api::{build_router, AppState};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "fitcoach-api", version, about = "FitCoach backend service")]
struct Cli {
    /// Folder holding fitcoach.db
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5780
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Config file (default: ~/.config/fitcoach/config.toml, then /etc/fitcoach/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Which relationship gets credit when a student has several active coaches
    /// (oldest, most_recent, reject)
    #[arg(long, global = true)]
    active_policy: Option<ActiveRelationshipPolicy>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Credit existing fact records to evaluations, then exit
    Backfill,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting FitCoach API (fitcoach-api) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let cli = Cli::parse();
    let overrides = CliOverrides {
        root_folder: cli.root_folder,
        bind: cli.bind,
        active_relationship_policy: cli.active_policy,
        config_file: cli.config,
    };
    let config = CoachConfig::resolve(&overrides).context("Failed to resolve configuration")?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Backfill => {
            let report = backfill(&pool, config.active_relationship_policy).await?;
            info!(
                "Backfill finished: {} relationships, {} aggregates created, {} updated, {} flags set",
                report.relationships, report.created, report.updated, report.flags_set
            );
            Ok(())
        }
        Command::Serve => serve(config, pool).await,
    }
}

async fn serve(config: CoachConfig, pool: sqlx::SqlitePool) -> Result<()> {
    let event_bus = EventBus::new(config.event_bus_capacity);
    let state = AppState::new(pool, event_bus, config.active_relationship_policy);

    info!(
        "Active relationship policy: {}",
        config.active_relationship_policy
    );

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("fitcoach-api listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("fitcoach-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
