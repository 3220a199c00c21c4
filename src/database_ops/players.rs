use anyhow::Result;
use tracing::{info, instrument};

use crate::database_ops::db::Db;
use crate::normalization::player::{
    AdvancedStat, GameLog, PlayerPage, PlayerProfile, PlayerSplit, SeasonRating, SeasonStat,
    SeasonAverages,
};

/// Latest-wins upsert of the player's profile row.
pub async fn upsert_player_profile(db: &Db, profile: &PlayerProfile) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO players (player_id, team, current_age, scraped_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(profile.player_id)
    .bind(&profile.team)
    .bind(profile.current_age)
    .bind(profile.scraped_at)
    .execute(&db.pool)
    .await?;
    Ok(())
}

pub async fn upsert_season_stat(db: &Db, stat: &SeasonStat) -> Result<()> {
    let line = &stat.line;
    sqlx::query(
        "INSERT OR REPLACE INTO player_season_stats (
            player_id, season, age, team, stat_type,
            games, minutes, points, rebounds, assists, steals, blocks,
            three_pt_made, three_pt_attempted, three_pt_pct,
            fg_made, fg_attempted, fg_pct,
            ft_made, ft_attempted, ft_pct,
            turnovers, offensive_rebounds, defensive_rebounds, scraped_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(stat.player_id)
    .bind(&stat.season)
    .bind(stat.age)
    .bind(&stat.team)
    .bind(stat.stat_type.as_str())
    .bind(line.games)
    .bind(line.minutes)
    .bind(line.points)
    .bind(line.rebounds)
    .bind(line.assists)
    .bind(line.steals)
    .bind(line.blocks)
    .bind(line.three_point_made)
    .bind(line.three_point_attempted)
    .bind(line.three_point_percentage)
    .bind(line.fg_made)
    .bind(line.fg_attempted)
    .bind(line.fg_percentage)
    .bind(line.ft_made)
    .bind(line.ft_attempted)
    .bind(line.ft_percentage)
    .bind(line.turnovers)
    .bind(line.offensive_rebounds)
    .bind(line.defensive_rebounds)
    .bind(stat.scraped_at)
    .execute(&db.pool)
    .await?;
    Ok(())
}

pub async fn upsert_game_log(db: &Db, log: &GameLog) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO player_game_logs (
            player_id, game_id, date, full_date, game_date, opponent, score, home_away,
            minutes, points, rebounds, assists, steals, blocks, turnovers, fouls,
            fg_made, fg_attempted, three_pt_made, three_pt_attempted,
            ft_made, ft_attempted, offensive_rebounds, defensive_rebounds,
            played_game, scraped_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(log.player_id)
    .bind(log.game_id)
    .bind(&log.date)
    .bind(&log.full_date)
    .bind(&log.game_date)
    .bind(&log.opponent)
    .bind(&log.score)
    .bind(log.home_away.as_str())
    .bind(log.minutes)
    .bind(log.points)
    .bind(log.rebounds)
    .bind(log.assists)
    .bind(log.steals)
    .bind(log.blocks)
    .bind(log.turnovers)
    .bind(log.fouls)
    .bind(log.fg_made)
    .bind(log.fg_attempted)
    .bind(log.three_point_made)
    .bind(log.three_point_attempted)
    .bind(log.ft_made)
    .bind(log.ft_attempted)
    .bind(log.offensive_rebounds)
    .bind(log.defensive_rebounds)
    .bind(log.played_game)
    .bind(log.scraped_at)
    .execute(&db.pool)
    .await?;
    Ok(())
}

pub async fn upsert_advanced_stat(db: &Db, stat: &AdvancedStat) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO player_advanced_stats (
            player_id, season, team, games, mpg, true_shooting, efg,
            assist_ratio, turnover_ratio, ast_to_ratio, efficiency, scraped_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(stat.player_id)
    .bind(&stat.season)
    .bind(&stat.team)
    .bind(stat.games)
    .bind(stat.mpg)
    .bind(stat.true_shooting)
    .bind(stat.efg)
    .bind(stat.assist_ratio)
    .bind(stat.turnover_ratio)
    .bind(stat.ast_to_ratio)
    .bind(stat.efficiency)
    .bind(stat.scraped_at)
    .execute(&db.pool)
    .await?;
    Ok(())
}

pub async fn upsert_season_rating(db: &Db, rating: &SeasonRating) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO player_ratings (
            player_id, season, team, rating_type,
            pts_rating, reb_rating, ast_rating, stl_rating, blk_rating,
            pt3m_rating, fgpct_rating, ftpct_rating, overall_rating, rank, scraped_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(rating.player_id)
    .bind(&rating.season)
    .bind(&rating.team)
    .bind(rating.rating_type.as_str())
    .bind(rating.pts_rating)
    .bind(rating.reb_rating)
    .bind(rating.ast_rating)
    .bind(rating.stl_rating)
    .bind(rating.blk_rating)
    .bind(rating.pt3m_rating)
    .bind(rating.fgpct_rating)
    .bind(rating.ftpct_rating)
    .bind(rating.overall_rating)
    .bind(rating.rank)
    .bind(rating.scraped_at)
    .execute(&db.pool)
    .await?;
    Ok(())
}

pub async fn upsert_split(db: &Db, split: &PlayerSplit) -> Result<()> {
    let line = &split.line;
    sqlx::query(
        "INSERT OR REPLACE INTO player_splits (
            player_id, split_type, split_category,
            games, minutes, points, rebounds, assists, steals, blocks,
            three_pt_made, three_pt_attempted, three_pt_pct,
            fg_made, fg_attempted, fg_pct,
            ft_made, ft_attempted, ft_pct,
            turnovers, offensive_rebounds, defensive_rebounds, scraped_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(split.player_id)
    .bind(split.split_type.as_str())
    .bind(&split.split_category)
    .bind(line.games)
    .bind(line.minutes)
    .bind(line.points)
    .bind(line.rebounds)
    .bind(line.assists)
    .bind(line.steals)
    .bind(line.blocks)
    .bind(line.three_point_made)
    .bind(line.three_point_attempted)
    .bind(line.three_point_percentage)
    .bind(line.fg_made)
    .bind(line.fg_attempted)
    .bind(line.fg_percentage)
    .bind(line.ft_made)
    .bind(line.ft_attempted)
    .bind(line.ft_percentage)
    .bind(line.turnovers)
    .bind(line.offensive_rebounds)
    .bind(line.defensive_rebounds)
    .bind(split.scraped_at)
    .execute(&db.pool)
    .await?;
    Ok(())
}

/// Persist every family of a normalized player page. Any row error aborts
/// the page; the caller records the failure in the scrape log and moves on
/// to the next player.
#[instrument(skip(db, page), fields(player_id = page.profile.player_id))]
pub async fn persist_player_page(db: &Db, page: &PlayerPage) -> Result<()> {
    upsert_player_profile(db, &page.profile).await?;
    for stat in &page.seasons {
        upsert_season_stat(db, stat).await?;
    }
    for log in &page.game_logs {
        upsert_game_log(db, log).await?;
    }
    for stat in &page.advanced {
        upsert_advanced_stat(db, stat).await?;
    }
    for rating in &page.ratings {
        upsert_season_rating(db, rating).await?;
    }
    for split in &page.splits {
        upsert_split(db, split).await?;
    }
    info!(
        seasons = page.seasons.len(),
        game_logs = page.game_logs.len(),
        advanced = page.advanced.len(),
        ratings = page.ratings.len(),
        splits = page.splits.len(),
        "persisted player page"
    );
    Ok(())
}

/// A thin projection used by the season endpoints.
#[derive(Debug, sqlx::FromRow, serde::Serialize)]
pub struct SeasonStatRow {
    pub player_id: i64,
    pub season: String,
    pub team: String,
    pub stat_type: String,
    pub games: Option<i64>,
    pub minutes: Option<f64>,
    pub points: Option<f64>,
    pub rebounds: Option<f64>,
    pub assists: Option<f64>,
}

pub async fn season_stats_for_player(db: &Db, player_id: i64) -> Result<Vec<SeasonStatRow>> {
    let rows = sqlx::query_as::<_, SeasonStatRow>(
        "SELECT player_id, season, team, stat_type, games, minutes, points, rebounds, assists
         FROM player_season_stats WHERE player_id = ? ORDER BY season, stat_type",
    )
    .bind(player_id)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

#[derive(Debug, sqlx::FromRow, serde::Serialize)]
pub struct RatingRow {
    pub player_id: i64,
    pub season: String,
    pub rating_type: String,
    pub overall_rating: Option<f64>,
    pub rank: Option<i64>,
}

pub async fn ratings_for_player(db: &Db, player_id: i64) -> Result<Vec<RatingRow>> {
    let rows = sqlx::query_as::<_, RatingRow>(
        "SELECT player_id, season, rating_type, overall_rating, rank
         FROM player_ratings WHERE player_id = ? ORDER BY season, rating_type",
    )
    .bind(player_id)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::db::test_db;
    use crate::normalization::player::{HomeAway, StatType};
    use chrono::Utc;

    fn profile(player_id: i64, team: &str) -> PlayerProfile {
        PlayerProfile {
            player_id,
            team: team.to_string(),
            current_age: Some(27),
            scraped_at: Utc::now(),
        }
    }

    fn season_stat(player_id: i64, season: &str, stat_type: StatType) -> SeasonStat {
        SeasonStat {
            player_id,
            season: season.to_string(),
            age: Some(25),
            team: "MEM".to_string(),
            stat_type,
            line: SeasonAverages {
                games: Some(70),
                points: Some(27.4),
                ..Default::default()
            },
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn profile_upsert_replaces_on_team_change() {
        let db = test_db().await;
        upsert_player_profile(&db, &profile(17, "MEM")).await.unwrap();
        upsert_player_profile(&db, &profile(17, "LAL")).await.unwrap();

        let (count, team): (i64, String) =
            sqlx::query_as("SELECT COUNT(*), MAX(team) FROM players WHERE player_id = 17")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert_eq!(team, "LAL");
    }

    #[tokio::test]
    async fn season_stat_types_are_distinct_rows() {
        let db = test_db().await;
        upsert_season_stat(&db, &season_stat(17, "2024-25", StatType::PerGame))
            .await
            .unwrap();
        upsert_season_stat(&db, &season_stat(17, "2024-25", StatType::Total))
            .await
            .unwrap();
        upsert_season_stat(&db, &season_stat(17, "2024-25", StatType::PerGame))
            .await
            .unwrap();

        let rows = season_stats_for_player(&db, 17).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.stat_type == "per_game"));
        assert!(rows.iter().any(|r| r.stat_type == "total"));
    }

    #[tokio::test]
    async fn game_log_round_trips_home_flag() {
        let db = test_db().await;
        let log = GameLog {
            player_id: 17,
            game_id: Some(2720),
            date: "Apr 11".to_string(),
            full_date: "2025-04-11".to_string(),
            game_date: "2025-04-11".to_string(),
            opponent: "DEN".to_string(),
            home_away: HomeAway::Home,
            score: "W 121-110".to_string(),
            minutes: Some(36),
            points: Some(31),
            rebounds: Some(6),
            assists: Some(8),
            steals: Some(2),
            blocks: Some(1),
            turnovers: Some(4),
            fg_made: Some(11),
            fg_attempted: Some(21),
            ft_made: Some(7),
            ft_attempted: Some(8),
            three_point_made: Some(2),
            three_point_attempted: Some(6),
            offensive_rebounds: Some(1),
            defensive_rebounds: Some(5),
            fouls: Some(2),
            played_game: true,
            scraped_at: Utc::now(),
        };
        upsert_game_log(&db, &log).await.unwrap();

        let (home_away, played): (String, bool) = sqlx::query_as(
            "SELECT home_away, played_game FROM player_game_logs WHERE player_id = 17",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!(home_away, "Home");
        assert!(played);
    }

    #[tokio::test]
    async fn ratings_query_returns_upserted_rows() {
        let db = test_db().await;
        let rating = SeasonRating {
            player_id: 17,
            season: "2024-25".to_string(),
            team: "MEM".to_string(),
            pts_rating: Some(8.2),
            reb_rating: Some(5.1),
            ast_rating: Some(7.7),
            stl_rating: Some(6.0),
            blk_rating: Some(2.3),
            pt3m_rating: Some(5.5),
            fgpct_rating: Some(6.8),
            ftpct_rating: Some(7.9),
            overall_rating: Some(6.8),
            rank: Some(41),
            rating_type: StatType::Total,
            scraped_at: Utc::now(),
        };
        upsert_season_rating(&db, &rating).await.unwrap();

        let rows = ratings_for_player(&db, 17).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rating_type, "total");
        assert_eq!(rows[0].overall_rating, Some(6.8));
        assert_eq!(rows[0].rank, Some(41));
    }
}
