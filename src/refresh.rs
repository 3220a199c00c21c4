// Background refresher: keeps a live scoreboard snapshot warm so read
// handlers never wait on upstreams. One task, one drift-free ticker.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cache::{Resource, ResourceHub};
use crate::normalization::scoreboard::{pair_scoreboard_games, ScoreboardGame};
use crate::util::env::{env_opt, env_parse};
use crate::util::season::{current_season, season_start_year};

/// What the read side sees. Swapped wholesale under the write lock, never
/// patched field by field, so a reader always gets games and count from the
/// same tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LiveSnapshot {
    pub games: Vec<ScoreboardGame>,
    pub standings: Option<Value>,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshMetrics {
    pub runs: u64,
    pub failures: u64,
    pub last_run_ms: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub season: String,
    pub interval: Duration,
}

impl RefreshConfig {
    /// Env: SEASON (dashed form, defaults to the season in progress),
    /// REFRESH_INTERVAL_SECS (default 60).
    pub fn from_env() -> Self {
        Self {
            season: env_opt("SEASON").unwrap_or_else(current_season),
            interval: Duration::from_secs(env_parse("REFRESH_INTERVAL_SECS", 60u64)),
        }
    }
}

/// Periodic scoreboard and standings refresh with an explicit stop.
///
/// [`Refresher::start`] spawns the loop and refreshes immediately; after that
/// it ticks on the configured interval. [`Refresher::stop`] signals the loop
/// and joins it. Handlers hold the snapshot and metrics handles, which outlive
/// the refresher itself.
pub struct Refresher {
    snapshot: Arc<RwLock<LiveSnapshot>>,
    metrics: Arc<Mutex<RefreshMetrics>>,
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl Refresher {
    pub fn start(hub: Arc<ResourceHub>, config: RefreshConfig) -> Self {
        let snapshot = Arc::new(RwLock::new(LiveSnapshot::default()));
        let metrics = Arc::new(Mutex::new(RefreshMetrics::default()));
        let (shutdown, _) = broadcast::channel::<()>(1);

        let loop_snapshot = snapshot.clone();
        let loop_metrics = metrics.clone();
        let mut shutdown_rx = shutdown.subscribe();
        let handle = tokio::spawn(async move {
            // drift-free interval; immediate first tick
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.recv() => {
                        info!("refresher: shutdown");
                        break;
                    }
                }

                let started = std::time::Instant::now();
                match refresh_once(&hub, &config.season).await {
                    Ok(next) => {
                        let elapsed_ms = started.elapsed().as_millis() as u64;
                        {
                            let mut m = loop_metrics.lock().await;
                            m.runs += 1;
                            m.last_run_ms = elapsed_ms;
                            m.last_error = None;
                        }
                        info!(
                            games = next.count,
                            elapsed_ms, "refresher: tick complete"
                        );
                        *loop_snapshot.write().await = next;
                    }
                    Err(err) => {
                        let elapsed_ms = started.elapsed().as_millis() as u64;
                        error!(error = %err, elapsed_ms, "refresher: tick failed");
                        {
                            let mut m = loop_metrics.lock().await;
                            m.failures += 1;
                            m.last_run_ms = elapsed_ms;
                            m.last_error = Some(err.to_string());
                        }
                        // Keep serving the previous games; only the error
                        // marker changes.
                        loop_snapshot.write().await.error = Some(err.to_string());
                    }
                }
            }
        });

        Self {
            snapshot,
            metrics,
            shutdown,
            handle,
        }
    }

    pub async fn snapshot(&self) -> LiveSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn metrics(&self) -> RefreshMetrics {
        self.metrics.lock().await.clone()
    }

    /// Shared handle for the API state; stays valid after [`Refresher::stop`].
    pub fn snapshot_handle(&self) -> Arc<RwLock<LiveSnapshot>> {
        self.snapshot.clone()
    }

    pub fn metrics_handle(&self) -> Arc<Mutex<RefreshMetrics>> {
        self.metrics.clone()
    }

    /// Signal the loop and wait for it to wind down. A tick already in flight
    /// finishes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.handle.await {
            warn!(error = %err, "refresher: task join failed");
        }
    }
}

/// One full refresh pass. Both payloads go through the cache with
/// force_refresh, so a healthy pass also rewrites the blobs other readers see.
async fn refresh_once(hub: &ResourceHub, season: &str) -> Result<LiveSnapshot> {
    let scoreboard = Resource::Scoreboard {
        season: season.to_string(),
    };
    let standings = Resource::Standings {
        season: season_start_year(season),
    };

    let (scoreboard_payload, standings_payload) = tokio::join!(
        hub.get_cached_resource(&scoreboard, true),
        hub.get_cached_resource(&standings, true),
    );

    let games = pair_scoreboard_games(&scoreboard_payload?, season)?;

    // Standings lagging a tick is tolerable; the scoreboard is what readers
    // are watching.
    let standings = match standings_payload {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(error = %err, "refresher: standings refresh failed");
            None
        }
    };

    Ok(LiveSnapshot {
        count: games.len(),
        games,
        standings,
        last_updated: Some(Utc::now()),
        error: None,
    })
}
