use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILTER: &str = "info";

/// Initializes the global `tracing` subscriber with stdout/stderr logging.
///
/// Verbosity comes from `RUST_LOG`; if that is unset or invalid it defaults
/// to `"info"`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn setup_stdout() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(true))
        .with(filter)
        .init();
    tracing::debug!("logging initialized with stdout/stderr output");
}
