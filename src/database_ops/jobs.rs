use anyhow::Result;
use futures::future::join_all;
use tracing::{error, info, warn};

use crate::database_ops::db::Db;
use crate::database_ops::rotowire::RotowireProvider;

#[async_trait::async_trait]
pub trait SyncJob: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, db: &Db) -> Result<()>;
}

pub struct JobRunner {
    db: Db,
}

impl JobRunner {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
    pub fn new_ref(db: &Db) -> Self {
        Self { db: db.clone() }
    }

    /// Run independent jobs concurrently, logging outcomes. Returns the
    /// first error after every job has finished.
    pub async fn run_all(&self, jobs: Vec<Box<dyn SyncJob>>) -> Result<()> {
        let mut tasks = Vec::with_capacity(jobs.len());
        for job in jobs {
            let db = self.db.clone();
            tasks.push(tokio::spawn(async move {
                info!(job = job.name(), "starting job");
                let res = job.run(&db).await;
                match &res {
                    Ok(_) => info!(job = job.name(), "job finished"),
                    Err(e) => error!(job = job.name(), error = %e, "job failed"),
                }
                res
            }));
        }
        let results = join_all(tasks).await;
        let mut first_err: Option<anyhow::Error> = None;
        for r in results {
            match r {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
                Err(join_err) => {
                    if first_err.is_none() {
                        first_err = Some(anyhow::anyhow!(join_err));
                    }
                }
            }
        }
        if let Some(e) = first_err {
            Err(e)
        } else {
            Ok(())
        }
    }

    /// Run jobs in order for stages that feed each other, such as a player
    /// sweep that reads rosters stored by the job before it. A failed job
    /// does not stop the ones after it; the first error comes back at the
    /// end.
    pub async fn run_sequence(&self, jobs: Vec<Box<dyn SyncJob>>) -> Result<()> {
        let mut first_err: Option<anyhow::Error> = None;
        for job in jobs {
            info!(job = job.name(), "starting job");
            match job.run(&self.db).await {
                Ok(()) => info!(job = job.name(), "job finished"),
                Err(e) => {
                    error!(job = job.name(), error = %e, "job failed");
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_err {
            Err(e)
        } else {
            Ok(())
        }
    }
}

// Adapters over the scrape drivers to satisfy SyncJob.

pub struct RosterJob {
    pub force: bool,
}

#[async_trait::async_trait]
impl SyncJob for RosterJob {
    fn name(&self) -> &'static str {
        "rosters"
    }
    async fn run(&self, db: &Db) -> Result<()> {
        let provider = RotowireProvider::new();
        super::rotowire::sync_rosters(db, &provider, self.force).await?;
        Ok(())
    }
}

/// Sweeps every player id found on a stored roster, so it only does useful
/// work after [`RosterJob`] has run at least once.
pub struct PlayerJob {
    pub force: bool,
}

#[async_trait::async_trait]
impl SyncJob for PlayerJob {
    fn name(&self) -> &'static str {
        "players"
    }
    async fn run(&self, db: &Db) -> Result<()> {
        let ids = super::teams::roster_player_ids(db).await?;
        if ids.is_empty() {
            warn!("no roster players stored, nothing to sync");
            return Ok(());
        }
        let provider = RotowireProvider::new();
        super::rotowire::sync_players(db, &provider, &ids, self.force).await?;
        Ok(())
    }
}

pub struct StandingsJob {
    pub season: i64,
    pub force: bool,
}

#[async_trait::async_trait]
impl SyncJob for StandingsJob {
    fn name(&self) -> &'static str {
        "standings"
    }
    async fn run(&self, db: &Db) -> Result<()> {
        let provider = RotowireProvider::new();
        super::rotowire::sync_standings(db, &provider, self.season, self.force).await?;
        Ok(())
    }
}

pub struct GameRangeJob {
    pub newest: i64,
    pub oldest: i64,
    pub force: bool,
}

#[async_trait::async_trait]
impl SyncJob for GameRangeJob {
    fn name(&self) -> &'static str {
        "game-range"
    }
    async fn run(&self, db: &Db) -> Result<()> {
        let provider = RotowireProvider::new();
        super::rotowire::scrape_game_range(db, &provider, self.newest, self.oldest, self.force)
            .await?;
        Ok(())
    }
}

pub struct RatingBackfillJob;

#[async_trait::async_trait]
impl SyncJob for RatingBackfillJob {
    fn name(&self) -> &'static str {
        "rating-backfill"
    }
    async fn run(&self, db: &Db) -> Result<()> {
        super::backfill::backfill_ratings(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::database_ops::db::test_db;

    struct FlagJob {
        name: &'static str,
        hit: Arc<AtomicBool>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl SyncJob for FlagJob {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn run(&self, _db: &Db) -> Result<()> {
            self.hit.store(true, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("{} blew up", self.name);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn sequence_runs_every_job_and_reports_first_error() {
        let db = test_db().await;
        let first = Arc::new(AtomicBool::new(false));
        let second = Arc::new(AtomicBool::new(false));
        let jobs: Vec<Box<dyn SyncJob>> = vec![
            Box::new(FlagJob {
                name: "boom",
                hit: first.clone(),
                fail: true,
            }),
            Box::new(FlagJob {
                name: "after",
                hit: second.clone(),
                fail: false,
            }),
        ];

        let err = JobRunner::new_ref(&db).run_sequence(jobs).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(first.load(Ordering::SeqCst));
        assert!(second.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn concurrent_jobs_all_run_and_first_error_surfaces() {
        let db = test_db().await;
        let first = Arc::new(AtomicBool::new(false));
        let second = Arc::new(AtomicBool::new(false));
        let jobs: Vec<Box<dyn SyncJob>> = vec![
            Box::new(FlagJob {
                name: "boom",
                hit: first.clone(),
                fail: true,
            }),
            Box::new(FlagJob {
                name: "fine",
                hit: second.clone(),
                fail: false,
            }),
        ];

        let err = JobRunner::new_ref(&db).run_all(jobs).await.unwrap_err();
        assert!(err.to_string().contains("blew up"));
        assert!(first.load(Ordering::SeqCst));
        assert!(second.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn rating_backfill_job_handles_an_empty_db() {
        let db = test_db().await;
        JobRunner::new(db)
            .run_sequence(vec![Box::new(RatingBackfillJob)])
            .await
            .unwrap();
    }
}
