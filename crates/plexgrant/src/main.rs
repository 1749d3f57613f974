// plexgrant service binary
//
// Wires configuration, the two plex.tv clients, and the reconciliation
// engine into an axum server. The process holds no credentials; every
// request authenticates itself.

mod routes;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use plexgrant_api::transport::{ClientMetadata, TransportConfig};
use plexgrant_api::{LegacyClient, PlexTvClient};
use plexgrant_config::Config;
use plexgrant_core::AccessReconciler;

use crate::routes::AppState;

#[derive(Debug, Parser)]
#[command(name = "plexgrant", version, about = "Delegated Plex library sharing service")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "plexgrant=info,plexgrant_core=info,plexgrant_api=info",
        1 => "plexgrant=debug,plexgrant_core=debug,plexgrant_api=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let mut config =
        Config::load(cli.config.as_deref()).map_err(|e| format!("config error: {e}"))?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    let transport = TransportConfig {
        timeout: Duration::from_secs(config.timeout_secs),
        metadata: ClientMetadata {
            product: config.client.product.clone(),
            version: config.client.version.clone(),
            client_identifier: config.client.client_identifier.clone(),
        },
    };
    let upstream = config.upstream().map_err(|e| format!("config error: {e}"))?;
    let legacy = LegacyClient::new(upstream.clone(), &transport)
        .map_err(|e| format!("client setup failed: {e}"))?;
    let plextv = PlexTvClient::new(upstream, &transport)
        .map_err(|e| format!("client setup failed: {e}"))?;

    let state = AppState {
        reconciler: Arc::new(AccessReconciler::new(legacy, plextv)),
    };
    let router = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .map_err(|e| format!("cannot bind {}: {e}", config.listen))?;
    info!(listen = %config.listen, upstream = %config.upstream_url, "plexgrant listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
