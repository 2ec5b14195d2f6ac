//! Tracing subscriber initialisation.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// `log_level` must already be in `tracing` form (`warn`, not `warning`);
/// `log_format` selects one of the four supported output styles.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_telemetry(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match log_format {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        "minimal" => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_target(false),
            )
            .try_init(),
        "debug" => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        // "default" and anything validation let through.
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    result.context("failed to initialise tracing subscriber")?;
    Ok(())
}
