// Persistence and ingestion: schema, upserts, scrape drivers, rating backfill.
// Each upstream gets its own submodule; db.rs owns the pool and schema.

pub mod backfill;
pub mod boxscores;
pub mod db;
pub mod jobs;
pub mod nba;
pub mod players;
pub mod rotowire;
pub mod scrape_log;
pub mod standings;
pub mod teams;

pub use db::Db;
