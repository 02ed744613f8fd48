use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use kvserve::cli::Args;
use kvserve::config::{Config, LogConfig, PORT_ENV};
use kvserve::{MemoryStore, Server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(log: &LogConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match &log.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file '{}'", path))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    config.apply_port_env(std::env::var(PORT_ENV).ok())?;
    if let Some(port) = args.port {
        config.set_port(port)?;
    }
    if let Some(level) = &args.log_level {
        config.log.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args).context("failed to load configuration")?;
    init_tracing(&config.log)?;

    info!("Starting KvServe - in-memory key-value store");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(MemoryStore::new());
    let server = Server::bind(&config, store.clone())
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr))?;
    info!("Server listening on: {}", server.local_addr());

    server.run(shutdown_signal()).await?;

    info!("Dropping {} entries on exit", store.len()?);
    Ok(())
}
