//! Configuration loading and validation.
//!
//! Values come from environment variables first (each env var supplies the
//! default for its flag), then from the command line, which always wins. The
//! process exits with a clear error message if any value is invalid.
//!
//! TLS follows a filesystem convention: when no explicit certificate and key
//! are configured, `<data-dir>/tls/{ca_cert.pem,cert.pem,key.pem}` are probed
//! and used if the files exist.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::args::Args;

/// Accepted `--log-level` values.
pub const LOG_LEVELS: &[&str] = &["debug", "info", "warning", "error"];

/// Accepted `--log-format` values.
pub const LOG_FORMATS: &[&str] = &["default", "minimal", "debug", "json"];

/// File names probed under `<data-dir>/tls/`.
const TLS_CA_FILE_NAME: &str = "ca_cert.pem";
const TLS_CERT_FILE_NAME: &str = "cert.pem";
const TLS_KEY_FILE_NAME: &str = "key.pem";

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Log level: debug, info, warning, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: default, minimal, debug, json.
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Serve TLS with a generated self-signed certificate.
    #[serde(default)]
    pub tls_autogen: bool,

    /// Explicit path to the PEM-encoded TLS private key.
    #[serde(default)]
    pub tls_key_file: Option<PathBuf>,

    /// Explicit path to the PEM-encoded TLS certificate chain.
    #[serde(default)]
    pub tls_cert_file: Option<PathBuf>,

    /// Explicit path to a PEM-encoded CA certificate.
    #[serde(default)]
    pub tls_ca_file: Option<PathBuf>,

    /// Directory for persistent state. Absent means state does not persist.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Maximum number of tasks processed concurrently.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "default".into()
}
fn default_http_port() -> u16 {
    3000
}
fn default_worker_count() -> usize {
    4
}

/// Resolved TLS mode for the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsSettings {
    /// Serve plain HTTP.
    Disabled,
    /// Generate a self-signed certificate in memory at startup.
    AutoGenerated,
    /// Load certificate and key (and optionally a CA) from the filesystem.
    Files {
        cert: PathBuf,
        key: PathBuf,
        ca: Option<PathBuf>,
    },
}

impl Config {
    /// Load configuration: environment variables as defaults, CLI values on top.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment value cannot be parsed or if
    /// validation fails.
    pub fn load(args: &Args) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("failed to build configuration from environment")?;

        let mut c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.apply_args(args);
        // An empty DATA_DIR means "do not persist", same as leaving it unset.
        if matches!(&c.data_dir, Some(d) if d.as_os_str().is_empty()) {
            c.data_dir = None;
        }
        c.validate()?;
        Ok(c)
    }

    /// Overlay command-line values onto the environment-derived config.
    fn apply_args(&mut self, args: &Args) {
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if let Some(format) = &args.log_format {
            self.log_format = format.clone();
        }
        if let Some(port) = args.http_port {
            self.http_port = port;
        }
        if args.tls_auto {
            self.tls_autogen = true;
        }
        if let Some(key) = &args.tls_key {
            self.tls_key_file = Some(key.clone());
        }
        if let Some(cert) = &args.tls_cert {
            self.tls_cert_file = Some(cert.clone());
        }
        if let Some(ca) = &args.tls_ca {
            self.tls_ca_file = Some(ca.clone());
        }
        if let Some(dir) = &args.data_dir {
            self.data_dir = Some(dir.clone());
        }
        if let Some(workers) = args.workers {
            self.worker_count = workers;
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            anyhow::bail!(
                "LOG_LEVEL must be one of: {} (got {:?})",
                LOG_LEVELS.join(", "),
                self.log_level
            );
        }
        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            anyhow::bail!(
                "LOG_FORMAT must be one of: {} (got {:?})",
                LOG_FORMATS.join(", "),
                self.log_format
            );
        }
        if self.http_port == 0 {
            anyhow::bail!("HTTP_PORT must be non-zero");
        }
        if self.worker_count == 0 {
            anyhow::bail!("WORKER_COUNT must be > 0");
        }
        if self.tls_cert_file.is_some() != self.tls_key_file.is_some() {
            anyhow::bail!("TLS_CERT_FILE and TLS_KEY_FILE must be provided together");
        }
        if self.tls_autogen && self.tls_cert_file.is_some() {
            anyhow::bail!("TLS_AUTOGEN cannot be combined with an explicit certificate and key");
        }
        Ok(())
    }

    /// The log level in the form `tracing` understands (`warning` → `warn`).
    pub fn tracing_level(&self) -> &str {
        if self.log_level == "warning" {
            "warn"
        } else {
            &self.log_level
        }
    }

    /// Resolve the TLS mode for the listener.
    ///
    /// Precedence: autogen flag, then explicit cert/key paths, then the
    /// `<data-dir>/tls/` convention. A conventional path is only used when the
    /// file actually exists; cert and key must both be present to enable TLS.
    pub fn tls_settings(&self) -> TlsSettings {
        if self.tls_autogen {
            return TlsSettings::AutoGenerated;
        }

        if let (Some(cert), Some(key)) = (&self.tls_cert_file, &self.tls_key_file) {
            return TlsSettings::Files {
                cert: cert.clone(),
                key: key.clone(),
                ca: self.tls_ca_file.clone(),
            };
        }

        if let Some(dir) = &self.data_dir {
            return tls_settings_from_dir(&dir.join("tls"));
        }

        TlsSettings::Disabled
    }
}

/// Probe a conventional TLS directory for certificate, key, and CA files.
fn tls_settings_from_dir(tls_dir: &Path) -> TlsSettings {
    let cert = tls_dir.join(TLS_CERT_FILE_NAME);
    let key = tls_dir.join(TLS_KEY_FILE_NAME);
    let ca = tls_dir.join(TLS_CA_FILE_NAME);

    if cert.is_file() && key.is_file() {
        TlsSettings::Files {
            cert,
            key,
            ca: ca.is_file().then_some(ca),
        }
    } else {
        TlsSettings::Disabled
    }
}
