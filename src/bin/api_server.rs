// HTTP API server binary: read surface over the store and caches, with the
// background snapshot refresher running alongside.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use ballhub::api::{ApiServer, AppState};
use ballhub::cache::ResourceHub;
use ballhub::database_ops::db::Db;
use ballhub::refresh::{RefreshConfig, Refresher};
use ballhub::tracing::{init_tracing, DEFAULT_FILTER};
use ballhub::util::env::{db_url, env_parse, init_env, preflight_check};

#[actix_web::main]
async fn main() -> Result<()> {
    init_env();
    init_tracing(DEFAULT_FILTER)?;

    // Everything has a default; the snapshot is for the operator reading logs.
    preflight_check(
        "api_server",
        &[],
        &[
            "DATABASE_URL",
            "CACHE_DIR",
            "API_ADDR",
            "CORS_ALLOWED_ORIGINS",
            "REFRESH_INTERVAL_SECS",
            "SEASON",
            "ROTOWIRE_BASE_URL",
            "NBA_API_BASE_URL",
        ],
    )?;

    let max_conns = env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&db_url(), max_conns)
        .await
        .context("database connect failed")?;

    let hub = Arc::new(ResourceHub::from_env()?);
    let refresher = Refresher::start(hub.clone(), RefreshConfig::from_env());

    let state = AppState {
        db,
        hub,
        snapshot: refresher.snapshot_handle(),
        metrics: refresher.metrics_handle(),
        started_at: Instant::now(),
    };

    info!("service started, press Ctrl+C to stop");
    ApiServer::from_env().run(state).await?;

    // actix has drained its workers by the time run() returns; only the
    // refresher is left.
    let metrics = refresher.metrics().await;
    info!(
        runs = metrics.runs,
        failures = metrics.failures,
        "refresher: final metrics"
    );
    refresher.stop().await;
    info!("all tasks stopped");
    Ok(())
}
