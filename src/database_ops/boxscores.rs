use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::database_ops::db::Db;
use crate::normalization::boxscore::{PlayerGameStat, ShootingLine, TeamGameStat};

/// Counts for one persisted box-score batch. Duplicate rows (already stored
/// from an earlier scrape) are neither saved nor failed.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub saved_players: usize,
    pub failed_players: usize,
    pub saved_teams: usize,
    pub failed_teams: usize,
}

impl BatchOutcome {
    pub fn total_failed(&self) -> usize {
        self.failed_players + self.failed_teams
    }
}

fn split_line(line: Option<ShootingLine>) -> (Option<i64>, Option<i64>, Option<f64>) {
    match line {
        Some(l) => (Some(l.made), Some(l.attempted), Some(l.percentage)),
        None => (None, None, None),
    }
}

/// Insert one player line. Returns true when a new row was written, false
/// when the (player, game, team) key already exists.
pub async fn insert_player_game_stat(db: &Db, stat: &PlayerGameStat) -> Result<bool> {
    let (fg_made, fg_attempted, fg_pct) = split_line(stat.field_goals);
    let (three_made, three_attempted, three_pct) = split_line(stat.three_pointers);
    let (ft_made, ft_attempted, ft_pct) = split_line(stat.free_throws);

    let result = sqlx::query(
        "INSERT OR IGNORE INTO player_game_stats (
            player_id, game_id, team_id, player_name, player_name_short,
            position, position_sort, minutes, points,
            fg_made, fg_attempted, fg_pct,
            three_pt_made, three_pt_attempted, three_pt_pct,
            ft_made, ft_attempted, ft_pct,
            offensive_rebounds, defensive_rebounds, assists, steals, blocks,
            turnovers, personal_fouls, technical_fouls, ejected,
            player_rating, scraped_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(stat.player_id)
    .bind(stat.game_id)
    .bind(stat.team_id)
    .bind(&stat.player_name)
    .bind(&stat.player_name_short)
    .bind(&stat.position)
    .bind(stat.position_sort)
    .bind(stat.minutes)
    .bind(stat.points)
    .bind(fg_made)
    .bind(fg_attempted)
    .bind(fg_pct)
    .bind(three_made)
    .bind(three_attempted)
    .bind(three_pct)
    .bind(ft_made)
    .bind(ft_attempted)
    .bind(ft_pct)
    .bind(stat.offensive_rebounds)
    .bind(stat.defensive_rebounds)
    .bind(stat.assists)
    .bind(stat.steals)
    .bind(stat.blocks)
    .bind(stat.turnovers)
    .bind(stat.personal_fouls)
    .bind(stat.technical_fouls)
    .bind(stat.ejected)
    .bind(stat.player_rating)
    .bind(stat.scraped_at)
    .execute(&db.pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Insert one team-total line under the same duplicate rules as player rows.
pub async fn insert_team_game_stat(db: &Db, stat: &TeamGameStat) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO team_game_stats (
            game_id, team_id, minutes, points,
            fg_made, fg_attempted, fg_pct,
            three_pt_made, three_pt_attempted, three_pt_pct,
            ft_made, ft_attempted, ft_pct,
            offensive_rebounds, defensive_rebounds, assists, steals, blocks,
            turnovers, personal_fouls, scraped_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(stat.game_id)
    .bind(stat.team_id)
    .bind(stat.minutes)
    .bind(stat.points)
    .bind(stat.field_goals.made)
    .bind(stat.field_goals.attempted)
    .bind(stat.field_goals.percentage)
    .bind(stat.three_pointers.made)
    .bind(stat.three_pointers.attempted)
    .bind(stat.three_pointers.percentage)
    .bind(stat.free_throws.made)
    .bind(stat.free_throws.attempted)
    .bind(stat.free_throws.percentage)
    .bind(stat.offensive_rebounds)
    .bind(stat.defensive_rebounds)
    .bind(stat.assists)
    .bind(stat.steals)
    .bind(stat.blocks)
    .bind(stat.turnovers)
    .bind(stat.personal_fouls)
    .bind(stat.scraped_at)
    .execute(&db.pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Record that a game was scraped and how many distinct teams showed up.
/// A complete game reports two; anything else flags a partial scrape.
pub async fn upsert_game_info(db: &Db, game_id: i64, teams_found: i64) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO game_info (game_id, scraped_at, teams_found) VALUES (?, ?, ?)")
        .bind(game_id)
        .bind(Utc::now())
        .bind(teams_found)
        .execute(&db.pool)
        .await?;
    Ok(())
}

/// Persist a normalized batch, tolerating individual row failures. Each
/// distinct game also gets its game_info row refreshed with the number of
/// distinct teams seen in the batch.
#[instrument(skip(db, players, teams))]
pub async fn persist_batch(
    db: &Db,
    players: &[PlayerGameStat],
    teams: &[TeamGameStat],
) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();

    for stat in players {
        match insert_player_game_stat(db, stat).await {
            Ok(true) => outcome.saved_players += 1,
            Ok(false) => {
                debug!(player_id = stat.player_id, game_id = stat.game_id, "duplicate player row")
            }
            Err(err) => {
                outcome.failed_players += 1;
                warn!(
                    player_id = stat.player_id,
                    game_id = stat.game_id,
                    error = %err,
                    "failed to persist player row"
                );
            }
        }
    }

    for stat in teams {
        match insert_team_game_stat(db, stat).await {
            Ok(true) => outcome.saved_teams += 1,
            Ok(false) => debug!(game_id = stat.game_id, team_id = stat.team_id, "duplicate team row"),
            Err(err) => {
                outcome.failed_teams += 1;
                warn!(
                    game_id = stat.game_id,
                    team_id = stat.team_id,
                    error = %err,
                    "failed to persist team row"
                );
            }
        }
    }

    let mut teams_by_game: HashMap<i64, HashSet<i64>> = HashMap::new();
    for stat in players {
        teams_by_game.entry(stat.game_id).or_default().insert(stat.team_id);
    }
    for stat in teams {
        teams_by_game.entry(stat.game_id).or_default().insert(stat.team_id);
    }
    for (game_id, team_ids) in &teams_by_game {
        upsert_game_info(db, *game_id, team_ids.len() as i64).await?;
    }

    info!(
        saved_players = outcome.saved_players,
        saved_teams = outcome.saved_teams,
        failed = outcome.total_failed(),
        games = teams_by_game.len(),
        "persisted box score batch"
    );
    Ok(outcome)
}

/// One game_info row for the games listing.
#[derive(Debug, sqlx::FromRow, serde::Serialize)]
pub struct GameInfoRow {
    pub game_id: i64,
    pub teams_found: Option<i64>,
    pub scraped_at: Option<chrono::DateTime<Utc>>,
}

pub async fn recent_games(db: &Db, limit: i64) -> Result<Vec<GameInfoRow>> {
    let rows = sqlx::query_as::<_, GameInfoRow>(
        "SELECT game_id, teams_found, scraped_at FROM game_info
         ORDER BY game_id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

#[derive(Debug, sqlx::FromRow, serde::Serialize)]
pub struct PlayerLineRow {
    pub player_id: i64,
    pub team_id: i64,
    pub player_name: String,
    pub position: Option<String>,
    pub minutes: i64,
    pub points: i64,
    pub fg_made: Option<i64>,
    pub fg_attempted: Option<i64>,
    pub fg_pct: Option<f64>,
    pub three_pt_made: Option<i64>,
    pub three_pt_attempted: Option<i64>,
    pub three_pt_pct: Option<f64>,
    pub ft_made: Option<i64>,
    pub ft_attempted: Option<i64>,
    pub ft_pct: Option<f64>,
    pub offensive_rebounds: i64,
    pub defensive_rebounds: i64,
    pub assists: i64,
    pub steals: i64,
    pub blocks: i64,
    pub turnovers: i64,
    pub personal_fouls: i64,
    pub player_rating: Option<f64>,
}

#[derive(Debug, sqlx::FromRow, serde::Serialize)]
pub struct TeamLineRow {
    pub game_id: i64,
    pub team_id: i64,
    pub minutes: i64,
    pub points: i64,
    pub fg_made: i64,
    pub fg_attempted: i64,
    pub fg_pct: f64,
    pub three_pt_made: i64,
    pub three_pt_attempted: i64,
    pub three_pt_pct: f64,
    pub ft_made: i64,
    pub ft_attempted: i64,
    pub ft_pct: f64,
    pub offensive_rebounds: i64,
    pub defensive_rebounds: i64,
    pub assists: i64,
    pub steals: i64,
    pub blocks: i64,
    pub turnovers: i64,
    pub personal_fouls: i64,
}

/// Everything stored for one game: player lines grouped by team order, then
/// the two team totals.
#[derive(Debug, serde::Serialize)]
pub struct GameStats {
    pub game_id: i64,
    pub players: Vec<PlayerLineRow>,
    pub teams: Vec<TeamLineRow>,
}

pub async fn game_stats(db: &Db, game_id: i64) -> Result<GameStats> {
    let players = sqlx::query_as::<_, PlayerLineRow>(
        "SELECT player_id, team_id, player_name, position, minutes, points,
                fg_made, fg_attempted, fg_pct,
                three_pt_made, three_pt_attempted, three_pt_pct,
                ft_made, ft_attempted, ft_pct,
                offensive_rebounds, defensive_rebounds, assists, steals, blocks,
                turnovers, personal_fouls, player_rating
         FROM player_game_stats WHERE game_id = ?
         ORDER BY team_id, position_sort, player_name",
    )
    .bind(game_id)
    .fetch_all(&db.pool)
    .await?;

    let teams = sqlx::query_as::<_, TeamLineRow>(
        "SELECT game_id, team_id, minutes, points,
                fg_made, fg_attempted, fg_pct,
                three_pt_made, three_pt_attempted, three_pt_pct,
                ft_made, ft_attempted, ft_pct,
                offensive_rebounds, defensive_rebounds, assists, steals, blocks,
                turnovers, personal_fouls
         FROM team_game_stats WHERE game_id = ? ORDER BY team_id",
    )
    .bind(game_id)
    .fetch_all(&db.pool)
    .await?;

    Ok(GameStats {
        game_id,
        players,
        teams,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::db::test_db;

    fn player_stat(player_id: i64, game_id: i64, team_id: i64) -> PlayerGameStat {
        PlayerGameStat {
            player_id,
            game_id,
            team_id,
            player_name: format!("Player {player_id}"),
            player_name_short: Some(format!("P. {player_id}")),
            position: Some("G".to_string()),
            position_sort: 1,
            minutes: 30,
            points: 18,
            field_goals: Some(ShootingLine::from_parts(7, 15)),
            three_pointers: None,
            free_throws: Some(ShootingLine::from_parts(4, 4)),
            offensive_rebounds: 2,
            defensive_rebounds: 5,
            assists: 4,
            steals: 1,
            blocks: 0,
            turnovers: 3,
            personal_fouls: 2,
            technical_fouls: 0,
            ejected: 0,
            player_rating: None,
            scraped_at: Utc::now(),
        }
    }

    fn team_stat(game_id: i64, team_id: i64) -> TeamGameStat {
        TeamGameStat {
            game_id,
            team_id,
            minutes: 240,
            points: 112,
            field_goals: ShootingLine::from_parts(41, 88),
            three_pointers: ShootingLine::from_parts(12, 34),
            free_throws: ShootingLine::from_parts(18, 22),
            offensive_rebounds: 10,
            defensive_rebounds: 33,
            assists: 25,
            steals: 7,
            blocks: 4,
            turnovers: 13,
            personal_fouls: 19,
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_player_rows_are_ignored() {
        let db = test_db().await;
        let stat = player_stat(17, 2720, 2);

        assert!(insert_player_game_stat(&db, &stat).await.unwrap());
        assert!(!insert_player_game_stat(&db, &stat).await.unwrap());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM player_game_stats")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn missing_shooting_line_stores_null() {
        let db = test_db().await;
        insert_player_game_stat(&db, &player_stat(17, 2720, 2))
            .await
            .unwrap();

        let three_made: Option<i64> =
            sqlx::query_scalar("SELECT three_pt_made FROM player_game_stats WHERE player_id = 17")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(three_made, None);

        let rating: Option<f64> =
            sqlx::query_scalar("SELECT player_rating FROM player_game_stats WHERE player_id = 17")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(rating, None);
    }

    #[tokio::test]
    async fn batch_counts_and_game_info() {
        let db = test_db().await;
        let players = vec![
            player_stat(17, 2720, 2),
            player_stat(18, 2720, 2),
            player_stat(44, 2720, 9),
        ];
        let teams = vec![team_stat(2720, 2), team_stat(2720, 9)];

        let outcome = persist_batch(&db, &players, &teams).await.unwrap();
        assert_eq!(outcome.saved_players, 3);
        assert_eq!(outcome.saved_teams, 2);
        assert_eq!(outcome.total_failed(), 0);

        let teams_found: i64 =
            sqlx::query_scalar("SELECT teams_found FROM game_info WHERE game_id = 2720")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(teams_found, 2);
    }

    #[tokio::test]
    async fn rescrape_counts_nothing_new() {
        let db = test_db().await;
        let players = vec![player_stat(17, 2720, 2)];
        let teams = vec![team_stat(2720, 2)];

        persist_batch(&db, &players, &teams).await.unwrap();
        let second = persist_batch(&db, &players, &teams).await.unwrap();
        assert_eq!(second.saved_players, 0);
        assert_eq!(second.saved_teams, 0);
        assert_eq!(second.total_failed(), 0);
    }

    #[tokio::test]
    async fn stored_games_come_back_through_the_projections() {
        let db = test_db().await;
        let players = vec![player_stat(17, 2720, 2), player_stat(44, 2720, 9)];
        let teams = vec![team_stat(2720, 2), team_stat(2720, 9)];
        persist_batch(&db, &players, &teams).await.unwrap();
        persist_batch(&db, &[player_stat(17, 2719, 2)], &[team_stat(2719, 2)])
            .await
            .unwrap();

        let recent = recent_games(&db, 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].game_id, 2720);
        assert_eq!(recent[0].teams_found, Some(2));

        let stats = game_stats(&db, 2720).await.unwrap();
        assert_eq!(stats.players.len(), 2);
        assert_eq!(stats.teams.len(), 2);
        assert_eq!(stats.players[0].team_id, 2);
        assert_eq!(stats.players[0].fg_made, Some(7));
        assert_eq!(stats.players[0].three_pt_made, None);

        let empty = game_stats(&db, 9999).await.unwrap();
        assert!(empty.players.is_empty() && empty.teams.is_empty());
    }
}
