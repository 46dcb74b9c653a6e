//! RidePulse - Reputation Cache and Alert Derivation Service
//!
//! Main entry point: loads configuration, connects the ephemeral and
//! durable store clients, seeds flag defaults, and serves the HTTP API.

use clap::Parser;
use ridepulse_core::{
    ApiServer, FeatureFlagGate, LibsqlRecordStore, Settings, UpstashStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ridepulse", version, about = "Rider feedback reputation and alerting service")]
struct Cli {
    /// Host to bind (overrides configuration)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides configuration)
    #[arg(long)]
    port: Option<u16>,

    /// Durable record store path (overrides configuration)
    #[arg(long, env = "RIDEPULSE_DB_PATH")]
    db_path: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(db_path) = cli.db_path {
        settings.durable.path = db_path;
    }

    let ephemeral = Arc::new(UpstashStore::new(&settings.ephemeral)?);
    let durable = Arc::new(
        LibsqlRecordStore::new_local(
            &settings.durable.path,
            Duration::from_millis(settings.durable.timeout_ms),
        )
        .await?,
    );

    // Connectivity check; the server still starts degraded so operators
    // can reach /health and the analytics views
    match ephemeral.ping().await {
        Ok(()) => info!("ephemeral store connection test successful"),
        Err(e) => warn!("ephemeral store unreachable at startup: {e}"),
    }

    // Make flag state explicit for dashboards; non-fatal on outage
    let flags = FeatureFlagGate::new(ephemeral.clone());
    if let Err(e) = flags.seed_defaults().await {
        warn!("could not seed feature flag defaults: {e}");
    }

    info!(
        threshold = settings.alerting.threshold,
        queue = ridepulse_core::keys::FEEDBACK_QUEUE,
        "starting RidePulse API service"
    );

    let server = ApiServer::new(&settings, ephemeral, durable)?;
    server.serve().await
}
