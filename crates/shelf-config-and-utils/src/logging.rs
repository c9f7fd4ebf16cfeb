//! Logging initialization for the account core.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging system.
///
/// Sets up tracing with:
/// - Log level from `RUST_LOG` env var or the provided default
/// - Compact formatter on stderr
///
/// Safe to call more than once; subsequent calls are no-ops.
///
/// # Example
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("Account core started");
/// ```
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
