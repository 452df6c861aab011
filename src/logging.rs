//! Shared logging utilities for hosts and test harnesses.
//!
//! The store's fail-soft API means failure detail lives in the logs, so a
//! host that does not already run a `tracing` subscriber should install one.

use crate::Result;

/// Initializes structured logging based on verbosity level.
///
/// An explicit `RUST_LOG` environment filter takes precedence over the
/// verbosity arguments.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
///
/// # Errors
/// Returns a configuration error if a global subscriber is already set.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| {
            crate::error::UserStoreError::configuration(format!(
                "failed to initialize logging: {e}"
            ))
        })?;

    Ok(())
}
