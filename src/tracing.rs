use tracing_subscriber::EnvFilter;

/// Fallback filter when `RUST_LOG` is unset. sqlx query logging is noisy at
/// info level, so it gets pinned down to warnings.
pub const DEFAULT_FILTER: &str = "info,ballhub=debug,sqlx=warn";

/// Sets up the global tracing subscriber with a fmt formatter and env filter.
/// All binaries route through here so log shape stays consistent.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
