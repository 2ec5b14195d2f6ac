//! CLI argument parsing.
//!
//! Every runtime option also has an environment-variable counterpart (see
//! [`crate::config`]); a value given on the command line wins over the
//! environment.

use clap::Parser;
use std::path::PathBuf;

/// A simple multi-threaded API with a queue.
#[derive(Parser, Debug, Default)]
#[command(name = "task-queue-api", version, about)]
pub struct Args {
    /// Set the log level: debug, info, warning, error. env: LOG_LEVEL
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Set the log format: default, minimal, debug, json. env: LOG_FORMAT
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// API HTTP port. env: HTTP_PORT
    #[arg(short = 'p', long = "port", value_name = "3000")]
    pub http_port: Option<u16>,

    /// Enable TLS with a generated self-signed certificate. env: TLS_AUTOGEN
    #[arg(long = "tls-auto")]
    pub tls_auto: bool,

    /// The full path to a TLS key file. env: TLS_KEY_FILE
    #[arg(long = "tls-key", value_name = "/path/to/tls/key.pem")]
    pub tls_key: Option<PathBuf>,

    /// The full path to a TLS certificate file. env: TLS_CERT_FILE
    #[arg(long = "tls-cert", value_name = "/path/to/tls/cert.pem")]
    pub tls_cert: Option<PathBuf>,

    /// The full path to a TLS CA certificate file. env: TLS_CA_FILE
    #[arg(long = "tls-ca", value_name = "/path/to/tls/ca_cert.pem")]
    pub tls_ca: Option<PathBuf>,

    /// The path for storing persistent data. If empty, state will not persist. env: DATA_DIR
    #[arg(long = "data-dir", value_name = "/data")]
    pub data_dir: Option<PathBuf>,

    /// Maximum number of tasks processed concurrently. env: WORKER_COUNT
    #[arg(long, value_name = "4")]
    pub workers: Option<usize>,

    /// Verify the binary starts, log a confirmation line, and exit.
    #[arg(long = "build-test")]
    pub build_test: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(args)
    }

    #[test]
    fn defaults_are_empty() {
        let args = parse_args(&["task-queue-api"]).unwrap();
        assert!(args.log_level.is_none());
        assert!(args.http_port.is_none());
        assert!(!args.tls_auto);
        assert!(!args.build_test);
    }

    #[test]
    fn parses_port_short_and_long() {
        let args = parse_args(&["task-queue-api", "-p", "8080"]).unwrap();
        assert_eq!(args.http_port, Some(8080));
        let args = parse_args(&["task-queue-api", "--port", "9090"]).unwrap();
        assert_eq!(args.http_port, Some(9090));
    }

    #[test]
    fn parses_tls_paths() {
        let args = parse_args(&[
            "task-queue-api",
            "--tls-cert",
            "/etc/tls/cert.pem",
            "--tls-key",
            "/etc/tls/key.pem",
        ])
        .unwrap();
        assert_eq!(args.tls_cert.unwrap(), PathBuf::from("/etc/tls/cert.pem"));
        assert_eq!(args.tls_key.unwrap(), PathBuf::from("/etc/tls/key.pem"));
    }

    #[test]
    fn rejects_bad_port() {
        assert!(parse_args(&["task-queue-api", "-p", "notaport"]).is_err());
    }
}
