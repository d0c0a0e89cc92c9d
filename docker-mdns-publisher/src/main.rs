mod config;
mod engine;
mod error;
mod interfaces;
mod labels;
mod mdns;
mod reconcile;
mod registry;
mod runtime;
mod validate;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use anyhow::{Context, Result};
use crate::config::Config;
use crate::engine::PublicationEngine;
use crate::mdns::MdnsAnnouncer;
use crate::reconcile::ReconciliationLoop;
use crate::runtime::DockerRuntime;
use crate::validate::HostnameValidator;

const DEFAULT_CONFIG_PATH: &str = "/etc/docker-mdns-publisher/publisher.toml";

#[tokio::main]
async fn main() {
    init_tracing();

    tracing::info!("docker-mdns-publisher v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        tracing::error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

/// RUST_LOG wins; otherwise LOG_LEVEL (default "info") sets our level, and
/// "trace" also turns up mdns-sd.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string())
            .to_ascii_lowercase();
        let level = match level.as_str() {
            "warning" => "warn",
            "critical" | "fatal" => "error",
            other => other,
        };
        let mdns_level = if level == "trace" { "debug" } else { "warn" };
        EnvFilter::new(format!("docker_mdns_publisher={level},mdns_sd={mdns_level}"))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> Result<()> {
    // Load config
    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::load_or_default(DEFAULT_CONFIG_PATH)?,
    };
    config
        .apply_env(|key| std::env::var(key).ok())
        .context("Invalid environment override")?;

    tracing::debug!("Configuration: {:?}", config);

    // Addresses to announce on, minus excluded networks
    let addresses = interfaces::discover(&config.mdns.adapters, &config.mdns.excluded_nets)?;

    let runtime = DockerRuntime::connect(&config.docker).await?;
    tracing::info!("Connected to docker daemon");

    let announcer = MdnsAnnouncer::open(&addresses, config.mdns.ip_version)?;
    tracing::info!("mDNS announcer bound to {:?}", addresses);

    let engine = PublicationEngine::new(
        announcer,
        Arc::new(HostnameValidator::new()),
        config.mdns.ttl_secs,
    );
    let mut reconciler = ReconciliationLoop::new(runtime, engine, config.diagnostics.verbose);

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    let signal_handle = tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        signal_cancel.cancel();
    });

    let result = reconciler.run(&cancel).await;
    signal_handle.abort();

    tracing::info!(
        "Stopping with {} containers publishing",
        reconciler.engine().registry().len()
    );
    let teardown = reconciler.shutdown();
    tracing::info!("Withdrew {} records, shutdown complete", teardown.withdrawn.len());

    result
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for ctrl-c: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
