use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::database_ops::db::Db;
use crate::normalization::rating::{rate, RatingLine};

/// Rows per transaction. Keeps a large backfill from holding one write
/// transaction across the whole table.
const BATCH_SIZE: usize = 100;

#[derive(Debug, sqlx::FromRow)]
struct UnratedRow {
    id: i64,
    points: Option<i64>,
    assists: Option<i64>,
    offensive_rebounds: Option<i64>,
    defensive_rebounds: Option<i64>,
    steals: Option<i64>,
    blocks: Option<i64>,
    turnovers: Option<i64>,
    personal_fouls: Option<i64>,
    fg_made: Option<i64>,
    fg_attempted: Option<i64>,
    three_pt_made: Option<i64>,
    ft_made: Option<i64>,
    ft_attempted: Option<i64>,
    ejected: Option<i64>,
}

impl UnratedRow {
    fn rating_line(&self) -> RatingLine {
        RatingLine {
            points: self.points.unwrap_or(0),
            assists: self.assists.unwrap_or(0),
            offensive_rebounds: self.offensive_rebounds.unwrap_or(0),
            defensive_rebounds: self.defensive_rebounds.unwrap_or(0),
            steals: self.steals.unwrap_or(0),
            blocks: self.blocks.unwrap_or(0),
            turnovers: self.turnovers.unwrap_or(0),
            personal_fouls: self.personal_fouls.unwrap_or(0),
            fg_made: self.fg_made.unwrap_or(0),
            fg_attempted: self.fg_attempted.unwrap_or(0),
            three_pt_made: self.three_pt_made.unwrap_or(0),
            ft_made: self.ft_made.unwrap_or(0),
            ft_attempted: self.ft_attempted.unwrap_or(0),
            ejections: self.ejected.unwrap_or(0),
        }
    }
}

/// Compute and store ratings for player rows that do not have one yet.
/// Re-runs only touch rows ingested since the last pass. Returns the number
/// of rows updated.
#[instrument(skip(db))]
pub async fn backfill_ratings(db: &Db) -> Result<u64> {
    let rows: Vec<UnratedRow> = sqlx::query_as(
        "SELECT id, points, assists, offensive_rebounds, defensive_rebounds,
                steals, blocks, turnovers, personal_fouls,
                fg_made, fg_attempted, three_pt_made, ft_made, ft_attempted, ejected
         FROM player_game_stats
         WHERE position_sort != 4 AND player_rating IS NULL
         ORDER BY id",
    )
    .fetch_all(&db.pool)
    .await?;

    if rows.is_empty() {
        info!("no unrated player rows");
        return Ok(0);
    }

    let mut updated = 0u64;
    for chunk in rows.chunks(BATCH_SIZE) {
        let mut tx = db.pool.begin().await?;
        for row in chunk {
            let rating = rate(&row.rating_line());
            sqlx::query("UPDATE player_game_stats SET player_rating = ? WHERE id = ?")
                .bind(rating)
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
            updated += 1;
        }
        tx.commit().await?;
        debug!(updated, "committed rating batch");
    }

    info!(updated, "backfilled player ratings");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::boxscores::insert_player_game_stat;
    use crate::database_ops::db::test_db;
    use crate::normalization::boxscore::{PlayerGameStat, ShootingLine};
    use chrono::Utc;

    fn stat(player_id: i64) -> PlayerGameStat {
        PlayerGameStat {
            player_id,
            game_id: 2720,
            team_id: 2,
            player_name: format!("Player {player_id}"),
            player_name_short: None,
            position: Some("G".to_string()),
            position_sort: 1,
            minutes: 30,
            points: 22,
            field_goals: Some(ShootingLine::from_parts(8, 16)),
            three_pointers: Some(ShootingLine::from_parts(2, 5)),
            free_throws: Some(ShootingLine::from_parts(4, 4)),
            offensive_rebounds: 1,
            defensive_rebounds: 6,
            assists: 5,
            steals: 2,
            blocks: 1,
            turnovers: 2,
            personal_fouls: 3,
            technical_fouls: 0,
            ejected: 0,
            player_rating: None,
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fills_null_ratings_and_is_idempotent() {
        let db = test_db().await;
        for player_id in [17, 18, 19] {
            insert_player_game_stat(&db, &stat(player_id)).await.unwrap();
        }

        let first = backfill_ratings(&db).await.unwrap();
        assert_eq!(first, 3);

        let ratings: Vec<Option<f64>> =
            sqlx::query_scalar("SELECT player_rating FROM player_game_stats ORDER BY player_id")
                .fetch_all(&db.pool)
                .await
                .unwrap();
        for rating in &ratings {
            let value = rating.expect("rating filled");
            assert!((0.0..=10.0).contains(&value));
        }

        // All three rows share a line, so they share a rating.
        let expected = rate(&RatingLine::from(&stat(17)));
        assert!(ratings.iter().all(|r| *r == Some(expected)));

        let second = backfill_ratings(&db).await.unwrap();
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn already_rated_rows_are_left_alone() {
        let db = test_db().await;
        insert_player_game_stat(&db, &stat(17)).await.unwrap();
        sqlx::query("UPDATE player_game_stats SET player_rating = 9.99 WHERE player_id = 17")
            .execute(&db.pool)
            .await
            .unwrap();

        assert_eq!(backfill_ratings(&db).await.unwrap(), 0);
        let rating: Option<f64> =
            sqlx::query_scalar("SELECT player_rating FROM player_game_stats WHERE player_id = 17")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(rating, Some(9.99));
    }
}
