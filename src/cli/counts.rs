// Row counts per table plus a recent-games tail, for eyeballing what a
// scrape pass actually stored.

use std::fmt::Write as _;

use anyhow::Result;

use crate::database_ops::boxscores::recent_games;
use crate::database_ops::db::Db;

const TABLES: [&str; 12] = [
    "game_info",
    "player_game_stats",
    "team_game_stats",
    "players",
    "player_season_stats",
    "player_game_logs",
    "player_advanced_stats",
    "player_ratings",
    "player_splits",
    "roster",
    "standings",
    "scraping_log",
];

async fn count(db: &Db, sql: &str) -> Result<i64> {
    Ok(sqlx::query_scalar(sql).fetch_one(&db.pool).await?)
}

/// Render the full report. Kept separate from printing so tests can read it.
pub async fn database_report(db: &Db, recent_limit: i64) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "DB COUNTS SUMMARY:").ok();
    for table in TABLES {
        let n = count(db, &format!("SELECT COUNT(*) FROM {table}")).await?;
        writeln!(out, "{table}: {n}").ok();
    }

    let complete_games = count(db, "SELECT COUNT(*) FROM game_info WHERE teams_found >= 2").await?;
    let rated = count(
        db,
        "SELECT COUNT(*) FROM player_game_stats WHERE player_rating IS NOT NULL",
    )
    .await?;
    let unrated = count(
        db,
        "SELECT COUNT(*) FROM player_game_stats
         WHERE position_sort != 4 AND player_rating IS NULL",
    )
    .await?;
    let failed_scrapes = count(db, "SELECT COUNT(*) FROM scraping_log WHERE success = 0").await?;
    writeln!(out, "games with both teams: {complete_games}").ok();
    writeln!(out, "player lines rated: {rated} (backfill pending: {unrated})").ok();
    writeln!(out, "scrape entities currently failed: {failed_scrapes}").ok();

    if recent_limit > 0 {
        let recent = recent_games(db, recent_limit).await?;
        writeln!(out, "recent games (by game_id desc, limit {recent_limit}):").ok();
        for game in recent {
            let teams = game.teams_found.unwrap_or(0);
            let when = game
                .scraped_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());
            writeln!(out, "  #{} teams={teams} scraped {when}", game.game_id).ok();
        }
    }

    Ok(out)
}

pub async fn run(db: &Db, recent_limit: i64) -> Result<()> {
    let report = database_report(db, recent_limit).await?;
    println!("{report}");
    Ok(())
}
