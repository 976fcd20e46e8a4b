//! Diagnostics sink for the `hjl` binary.

use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "HJL_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Installs a stderr subscriber filtered by `HJL_LOG`.
///
/// Stdout carries command output, so diagnostics never go there.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
