//! TLS listener setup using rustls.
//!
//! Certificates come either from PEM files named by configuration (explicitly
//! or via the `<data-dir>/tls/` convention) or from a self-signed certificate
//! generated in memory at startup when `--tls-auto` is set.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::service::TowerToHyperService;
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

/// Connections that do not finish the TLS handshake within this window are dropped.
pub const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate and private key bytes.
///
/// # Errors
///
/// Returns an error if the certificate or key cannot be parsed, or if rustls
/// rejects the configuration.
pub fn build_server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>> {
    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse TLS certificate chain")?;

    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_pem))
        .context("failed to read TLS private key")?
        .context("no private key found in PEM data")?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("failed to build rustls ServerConfig")?;

    Ok(Arc::new(config))
}

/// Load certificate and key files from disk and build the server config.
///
/// # Errors
///
/// Returns an error if either file cannot be read or parsed.
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>> {
    let cert_pem = std::fs::read(cert_path)
        .with_context(|| format!("failed to read TLS certificate {}", cert_path.display()))?;
    let key_pem = std::fs::read(key_path)
        .with_context(|| format!("failed to read TLS key {}", key_path.display()))?;
    build_server_config(&cert_pem, &key_pem)
}

/// Generate a self-signed certificate for localhost and build the server config.
///
/// Nothing is written to disk; the certificate lives only for this process.
///
/// # Errors
///
/// Returns an error if certificate generation fails.
pub fn self_signed_config() -> Result<Arc<ServerConfig>> {
    let certified = rcgen::generate_simple_self_signed(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ])
    .context("failed to generate self-signed certificate")?;

    let cert_pem = certified.cert.pem();
    let key_pem = certified.key_pair.serialize_pem();
    info!("generated self-signed TLS certificate for localhost");
    build_server_config(cert_pem.as_bytes(), key_pem.as_bytes())
}

/// Parse a PEM-encoded CA bundle, returning the number of certificates found.
///
/// Client-certificate verification is not performed; this validates the
/// configured CA file so a bad path or corrupt file fails at startup.
///
/// # Errors
///
/// Returns an error if the data is not parseable PEM or contains no certificates.
pub fn count_ca_certs(ca_pem: &[u8]) -> Result<usize> {
    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(ca_pem))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse TLS CA certificate")?;
    if certs.is_empty() {
        anyhow::bail!("no certificates found in CA PEM data");
    }
    Ok(certs.len())
}

/// Serve the router over TLS until the shutdown future resolves.
///
/// Each accepted connection gets its own task; a failed or timed-out handshake
/// drops that connection without affecting the listener. On shutdown the
/// listener closes first, then open connections are awaited before returning.
///
/// # Errors
///
/// Returns an error only for listener-level failures surfaced at startup;
/// per-connection errors are logged and swallowed.
pub async fn serve(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    router: Router,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let acceptor = TlsAcceptor::from(config);
    let mut conns = tokio::task::JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("shutdown signal received; closing TLS listener");
                break;
            }
            // Reap finished connection tasks so the set does not grow unbounded.
            Some(_) = conns.join_next(), if !conns.is_empty() => {}
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "TCP accept failed");
                        continue;
                    }
                };
                let acceptor = acceptor.clone();
                let service = TowerToHyperService::new(router.clone());
                conns.spawn(async move {
                    let tls_stream = match tokio::time::timeout(
                        TLS_HANDSHAKE_TIMEOUT,
                        acceptor.accept(stream),
                    )
                    .await
                    {
                        Ok(Ok(s)) => s,
                        Ok(Err(e)) => {
                            debug!(peer = %peer, error = %e, "TLS handshake failed");
                            return;
                        }
                        Err(_) => {
                            debug!(peer = %peer, "TLS handshake timed out");
                            return;
                        }
                    };

                    let io = TokioIo::new(tls_stream);
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection_with_upgrades(io, service)
                        .await
                    {
                        debug!(peer = %peer, error = %e, "connection error");
                    }
                });
            }
        }
    }

    drop(listener);
    if !conns.is_empty() {
        info!(connections = conns.len(), "draining open TLS connections");
        while conns.join_next().await.is_some() {}
    }
    Ok(())
}
