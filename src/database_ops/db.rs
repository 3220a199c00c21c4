use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, instrument};

/// Full schema, applied on every connect. Every statement is idempotent so
/// a restart against an existing file is a no-op.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS player_game_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER,
    game_id INTEGER,
    team_id INTEGER,
    player_name TEXT,
    player_name_short TEXT,
    position TEXT,
    position_sort INTEGER,
    minutes INTEGER,
    points INTEGER,
    fg_made INTEGER,
    fg_attempted INTEGER,
    fg_pct REAL,
    three_pt_made INTEGER,
    three_pt_attempted INTEGER,
    three_pt_pct REAL,
    ft_made INTEGER,
    ft_attempted INTEGER,
    ft_pct REAL,
    offensive_rebounds INTEGER,
    defensive_rebounds INTEGER,
    assists INTEGER,
    steals INTEGER,
    blocks INTEGER,
    turnovers INTEGER,
    personal_fouls INTEGER,
    technical_fouls INTEGER,
    ejected INTEGER,
    player_rating REAL,
    scraped_at DATETIME,
    UNIQUE(player_id, game_id, team_id)
);

CREATE TABLE IF NOT EXISTS team_game_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id INTEGER,
    team_id INTEGER,
    minutes INTEGER,
    points INTEGER,
    fg_made INTEGER,
    fg_attempted INTEGER,
    fg_pct REAL,
    three_pt_made INTEGER,
    three_pt_attempted INTEGER,
    three_pt_pct REAL,
    ft_made INTEGER,
    ft_attempted INTEGER,
    ft_pct REAL,
    offensive_rebounds INTEGER,
    defensive_rebounds INTEGER,
    assists INTEGER,
    steals INTEGER,
    blocks INTEGER,
    turnovers INTEGER,
    personal_fouls INTEGER,
    scraped_at DATETIME,
    UNIQUE(game_id, team_id)
);

CREATE TABLE IF NOT EXISTS game_info (
    game_id INTEGER PRIMARY KEY,
    scraped_at DATETIME,
    teams_found INTEGER
);

CREATE TABLE IF NOT EXISTS players (
    player_id INTEGER PRIMARY KEY,
    team TEXT,
    current_age INTEGER,
    scraped_at DATETIME
);

CREATE TABLE IF NOT EXISTS player_season_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER,
    season TEXT,
    age INTEGER,
    team TEXT,
    stat_type TEXT,
    games INTEGER,
    minutes REAL,
    points REAL,
    rebounds REAL,
    assists REAL,
    steals REAL,
    blocks REAL,
    three_pt_made REAL,
    three_pt_attempted REAL,
    three_pt_pct REAL,
    fg_made REAL,
    fg_attempted REAL,
    fg_pct REAL,
    ft_made REAL,
    ft_attempted REAL,
    ft_pct REAL,
    turnovers REAL,
    offensive_rebounds REAL,
    defensive_rebounds REAL,
    scraped_at DATETIME,
    UNIQUE(player_id, season, stat_type)
);

CREATE TABLE IF NOT EXISTS player_game_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER,
    game_id INTEGER,
    date TEXT,
    full_date TEXT,
    game_date TEXT,
    opponent TEXT,
    score TEXT,
    home_away TEXT,
    minutes INTEGER,
    points INTEGER,
    rebounds INTEGER,
    assists INTEGER,
    steals INTEGER,
    blocks INTEGER,
    turnovers INTEGER,
    fouls INTEGER,
    fg_made INTEGER,
    fg_attempted INTEGER,
    three_pt_made INTEGER,
    three_pt_attempted INTEGER,
    ft_made INTEGER,
    ft_attempted INTEGER,
    offensive_rebounds INTEGER,
    defensive_rebounds INTEGER,
    played_game INTEGER,
    scraped_at DATETIME,
    UNIQUE(player_id, game_id)
);

CREATE TABLE IF NOT EXISTS player_advanced_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER,
    season TEXT,
    team TEXT,
    games INTEGER,
    mpg REAL,
    true_shooting REAL,
    efg REAL,
    assist_ratio REAL,
    turnover_ratio REAL,
    ast_to_ratio REAL,
    efficiency REAL,
    scraped_at DATETIME,
    UNIQUE(player_id, season)
);

CREATE TABLE IF NOT EXISTS player_ratings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER,
    season TEXT,
    team TEXT,
    rating_type TEXT,
    pts_rating REAL,
    reb_rating REAL,
    ast_rating REAL,
    stl_rating REAL,
    blk_rating REAL,
    pt3m_rating REAL,
    fgpct_rating REAL,
    ftpct_rating REAL,
    overall_rating REAL,
    rank INTEGER,
    scraped_at DATETIME,
    UNIQUE(player_id, season, rating_type)
);

CREATE TABLE IF NOT EXISTS player_splits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER,
    split_type TEXT,
    split_category TEXT,
    games INTEGER,
    minutes REAL,
    points REAL,
    rebounds REAL,
    assists REAL,
    steals REAL,
    blocks REAL,
    three_pt_made REAL,
    three_pt_attempted REAL,
    three_pt_pct REAL,
    fg_made REAL,
    fg_attempted REAL,
    fg_pct REAL,
    ft_made REAL,
    ft_attempted REAL,
    ft_pct REAL,
    turnovers REAL,
    offensive_rebounds REAL,
    defensive_rebounds REAL,
    scraped_at DATETIME,
    UNIQUE(player_id, split_type, split_category)
);

CREATE TABLE IF NOT EXISTS roster (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    team_code TEXT,
    player_id INTEGER,
    player_url TEXT,
    name_long TEXT,
    name_short TEXT,
    position TEXT,
    jersey TEXT,
    height_inches INTEGER,
    height TEXT,
    weight TEXT,
    draft TEXT,
    school TEXT,
    age INTEGER,
    totals TEXT,
    per_game TEXT,
    extras TEXT,
    scraped_at DATETIME,
    UNIQUE(team_code, player_id)
);

CREATE TABLE IF NOT EXISTS standings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    season INTEGER,
    team_name TEXT,
    team_code TEXT,
    conference TEXT,
    division TEXT,
    wins INTEGER,
    losses INTEGER,
    win_percentage REAL,
    points_for_per_game REAL,
    points_against_per_game REAL,
    point_differential REAL,
    home_record TEXT,
    away_record TEXT,
    conference_record TEXT,
    division_record TEXT,
    last_ten_record TEXT,
    streak TEXT,
    conference_seed INTEGER,
    games_back REAL,
    scraped_at DATETIME,
    UNIQUE(season, team_code)
);

CREATE TABLE IF NOT EXISTS scraping_log (
    entity TEXT PRIMARY KEY,
    success INTEGER,
    error_message TEXT,
    scraped_at DATETIME
);

CREATE INDEX IF NOT EXISTS idx_player_game_stats_game ON player_game_stats(game_id);
CREATE INDEX IF NOT EXISTS idx_player_game_stats_player ON player_game_stats(player_id);
CREATE INDEX IF NOT EXISTS idx_player_game_logs_player ON player_game_logs(player_id);
"#;

#[derive(Clone)]
pub struct Db {
    pub pool: SqlitePool,
}

impl Db {
    // DSNs stay out of tracing spans.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // WAL lets API reads proceed while a scrape writes. In-memory
        // databases only support their own journal mode, so leave those be.
        if !database_url.contains(":memory:") {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(options)
            .await?;
        info!("connected to db");

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }
}

#[cfg(test)]
pub(crate) async fn test_db() -> Db {
    // One connection only: each in-memory connection is its own database.
    Db::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_is_created_on_connect() {
        let db = test_db().await;
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();

        for expected in [
            "player_game_stats",
            "team_game_stats",
            "game_info",
            "players",
            "player_season_stats",
            "player_game_logs",
            "player_advanced_stats",
            "player_ratings",
            "player_splits",
            "roster",
            "standings",
            "scraping_log",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn reconnect_is_idempotent() {
        let db = test_db().await;
        sqlx::raw_sql(SCHEMA).execute(&db.pool).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM standings")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
