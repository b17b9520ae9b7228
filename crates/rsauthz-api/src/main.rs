//! rsauthz service binary
//!
//! Loads configuration, sets up logging and runs the tuple reconciler
//! until the process is asked to stop.
//!
//! # Usage
//!
//! ```bash
//! # With config file and an object snapshot
//! rsauthz --config config.yaml --objects objects.json
//!
//! # With environment variables only
//! RSAUTHZ_RECONCILER__WORKERS=8 rsauthz
//! ```

mod observability;

use std::sync::Arc;

use clap::Parser;
use rsauthz_server::{MemoryObjectSource, Reconciler, ServerConfig, StoreCache};
use rsauthz_store::MemoryTupleStore;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use observability::{init_logging, LoggingConfig};

/// rsauthz - relationship-based authorization service
#[derive(Parser, Debug)]
#[command(name = "rsauthz")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON snapshot of declarative objects per namespace
    #[arg(short, long, env = "RSAUTHZ_OBJECTS")]
    objects: Option<String>,

    /// Log span enter/exit events
    #[arg(long)]
    log_spans: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::from_env()?,
    };

    let mut log_config = LoggingConfig::from(&config.logging);
    if args.log_spans {
        log_config = log_config.with_spans();
    }
    init_logging(log_config);

    info!(version = env!("CARGO_PKG_VERSION"), "starting rsauthz");

    let source = match &args.objects {
        Some(path) => {
            info!(%path, "loading declarative objects");
            MemoryObjectSource::from_json_file(path)?
        }
        None => MemoryObjectSource::new(),
    };

    let store = MemoryTupleStore::new_shared();
    let cache = Arc::new(StoreCache::new(Arc::clone(&store)));
    let reconciler = Arc::new(Reconciler::new(
        store,
        Arc::new(source),
        cache,
        config.reconciler.clone(),
    ));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Arc::clone(&reconciler).run(cancel.clone()));

    shutdown_signal().await;
    cancel.cancel();
    if let Err(err) = handle.await {
        error!(error = %err, "reconciler task failed");
    }

    info!("shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, draining reconciler");
        }
        _ = terminate => {
            info!("received SIGTERM, draining reconciler");
        }
    }
}
