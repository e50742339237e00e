//! assignment-finder
//!
//! Places requesting endpoints into the lowest free slot of a fixed pool and
//! reports each outcome to the operator channel.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use slotpool_finder::{
    api, bootstrap,
    config::{Config, StoreKind},
    state::AppState,
};
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Slot assignment finder.
#[derive(Debug, Parser)]
#[command(name = "assignment-finder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve invocations over HTTP until interrupted (default).
    Serve,

    /// Run a single invocation and print the result.
    Invoke {
        /// Event JSON; read from stdin when omitted.
        #[arg(long)]
        event: Option<String>,
    },

    /// Create the Postgres assignment table if it does not exist.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Prefer RUST_LOG, fall back to LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Invoke { event } => invoke_once(config, event).await,
        Command::Migrate => migrate(config).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting assignment finder");
    info!(listen_addr = %config.listen_addr, "Configuration loaded");

    let finder = bootstrap::build_finder(&config).await?;
    let app = api::create_router(AppState::new(finder));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Received shutdown signal");
    });

    if let Err(e) = server.await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Assignment finder shutdown complete");
    Ok(())
}

async fn invoke_once(config: Config, event: Option<String>) -> Result<()> {
    let raw = match event {
        Some(event) => event,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read event from stdin")?;
            buf
        }
    };

    let finder = bootstrap::build_finder(&config).await?;
    let event = api::parse_event(raw.as_bytes());
    let outcome = finder
        .handle_event(&event)
        .await
        .context("Invocation failed")?;

    println!("{}", serde_json::to_string(&outcome.result())?);
    Ok(())
}

async fn migrate(config: Config) -> Result<()> {
    if config.store != StoreKind::Postgres {
        bail!("migrate requires ASSIGNMENT_STORE=postgres");
    }

    let table = bootstrap::connect_pg_table(&config).await?;
    table
        .ensure_table()
        .await
        .context("Failed to create assignment table")?;
    Ok(())
}
