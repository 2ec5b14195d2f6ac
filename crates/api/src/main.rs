//! `task-queue-api` — binary entry point.
//!
//! Startup sequence:
//! 1. Parse CLI arguments and load + validate [`Config`] (env first, CLI wins).
//! 2. Initialise telemetry (tracing subscriber, level and format from config).
//! 3. Prepare the data directory and restore any persisted task state.
//! 4. Start the queue dispatcher and worker pool.
//! 5. Build the Axum router and serve, plain or over TLS, until ctrl-c.
//! 6. Drain in-flight tasks and exit.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use api::args::Args;
use api::config::{Config, TlsSettings};
use api::queue::{Dispatcher, TaskStore};
use api::server::state::{AppState, Meta};
use api::server::{self, tls};
use api::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let args = Args::parse();
    let cfg = Config::load(&args).map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.tracing_level(), &cfg.log_format)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.http_port,
        workers = cfg.worker_count,
        "task-queue-api starting"
    );

    // Build test: the wiring above succeeded, report and exit.
    if args.build_test {
        info!("Build test complete");
        return Ok(());
    }

    // -----------------------------------------------------------------------
    // 3. Persistent state
    // -----------------------------------------------------------------------
    let store = match &cfg.data_dir {
        Some(dir) => {
            prepare_data_dir(dir)?;
            let store = TaskStore::with_snapshot(dir.join("tasks.json"));
            let restored = store.load().await?;
            if restored > 0 {
                info!(count = restored, "restored tasks from snapshot");
            }
            store
        }
        None => {
            info!("no data directory configured; state will not persist");
            TaskStore::new()
        }
    };

    // -----------------------------------------------------------------------
    // 4. Worker pool
    // -----------------------------------------------------------------------
    let (dispatcher, worker) = Dispatcher::start(store.clone(), cfg.worker_count);

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(store, dispatcher.clone(), Meta::default());
    let router = server::router::build(state);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.http_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    match cfg.tls_settings() {
        TlsSettings::Disabled => {
            info!(addr = %addr, "listening (http)");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        TlsSettings::AutoGenerated => {
            let tls_config = tls::self_signed_config()?;
            info!(addr = %addr, "listening (https, self-signed certificate)");
            tls::serve(listener, tls_config, router, shutdown_signal()).await?;
        }
        TlsSettings::Files { cert, key, ca } => {
            if let Some(ca_path) = &ca {
                let ca_pem = std::fs::read(ca_path).with_context(|| {
                    format!("failed to read TLS CA certificate {}", ca_path.display())
                })?;
                let count = tls::count_ca_certs(&ca_pem)?;
                info!(path = %ca_path.display(), certs = count, "TLS CA bundle loaded");
            }
            let tls_config = tls::load_server_config(&cert, &key)?;
            info!(addr = %addr, cert = %cert.display(), "listening (https)");
            tls::serve(listener, tls_config, router, shutdown_signal()).await?;
        }
    }

    // -----------------------------------------------------------------------
    // 6. Drain and stop
    // -----------------------------------------------------------------------
    drop(dispatcher);
    if let Err(e) = worker.await {
        warn!(error = %e, "dispatcher task ended abnormally");
    }
    info!("Server stopped");
    Ok(())
}

/// Create the persistent data directory tree, including the conventional
/// `tls/` subdirectory, failing with a descriptive error if that is not possible.
fn prepare_data_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir.join("tls"))
        .with_context(|| format!("failed to create data directory {}", dir.display()))
}

/// Resolves once ctrl-c is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("ctrl-c received; shutting down");
}
