use anyhow::Result;
use tracing::info;

use crate::database_ops::db::Db;
use crate::normalization::standings::StandingRow;

/// Latest-wins upsert keyed on (season, team_code).
pub async fn upsert_standing(db: &Db, row: &StandingRow) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO standings (
            season, team_name, team_code, conference, division,
            wins, losses, win_percentage,
            points_for_per_game, points_against_per_game, point_differential,
            home_record, away_record, conference_record, division_record,
            last_ten_record, streak, conference_seed, games_back, scraped_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(row.season)
    .bind(&row.team_name)
    .bind(&row.team_code)
    .bind(&row.conference)
    .bind(&row.division)
    .bind(row.wins)
    .bind(row.losses)
    .bind(row.win_percentage)
    .bind(row.points_for_per_game)
    .bind(row.points_against_per_game)
    .bind(row.point_differential)
    .bind(&row.home_record)
    .bind(&row.away_record)
    .bind(&row.conference_record)
    .bind(&row.division_record)
    .bind(&row.last_ten_record)
    .bind(&row.streak)
    .bind(row.conference_seed)
    .bind(row.games_back)
    .bind(row.scraped_at)
    .execute(&db.pool)
    .await?;
    Ok(())
}

pub async fn persist_standings(db: &Db, rows: &[StandingRow]) -> Result<usize> {
    for row in rows {
        upsert_standing(db, row).await?;
    }
    if let Some(first) = rows.first() {
        info!(season = first.season, teams = rows.len(), "persisted standings");
    }
    Ok(rows.len())
}

/// Stored standings projection served by the API.
#[derive(Debug, sqlx::FromRow, serde::Serialize)]
pub struct StandingRecord {
    pub season: i64,
    pub team_name: String,
    pub team_code: String,
    pub conference: String,
    pub division: String,
    pub wins: i64,
    pub losses: i64,
    pub win_percentage: f64,
    pub conference_seed: Option<i64>,
    pub games_back: Option<f64>,
    pub streak: String,
}

pub async fn standings_for_season(db: &Db, season: i64) -> Result<Vec<StandingRecord>> {
    let rows = sqlx::query_as::<_, StandingRecord>(
        "SELECT season, team_name, team_code, conference, division,
                wins, losses, win_percentage, conference_seed, games_back, streak
         FROM standings WHERE season = ?
         ORDER BY conference, win_percentage DESC, wins DESC",
    )
    .bind(season)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(team_code: &str, wins: i64, win_percentage: f64) -> StandingRow {
        StandingRow {
            season: 2025,
            team_name: format!("Team {team_code}"),
            team_code: team_code.to_string(),
            conference: "Eastern".to_string(),
            division: "Atlantic".to_string(),
            wins,
            losses: 82 - wins,
            win_percentage,
            points_for_per_game: 115.0,
            points_against_per_game: 110.0,
            point_differential: 5.0,
            home_record: "25-16".to_string(),
            away_record: "20-21".to_string(),
            conference_record: "30-22".to_string(),
            division_record: "10-6".to_string(),
            last_ten_record: "6-4".to_string(),
            streak: "W2".to_string(),
            conference_seed: None,
            games_back: None,
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn season_query_orders_by_win_percentage() {
        let db = crate::database_ops::db::test_db().await;
        persist_standings(&db, &[row("NYK", 45, 0.549), row("BOS", 52, 0.634)])
            .await
            .unwrap();

        let stored = standings_for_season(&db, 2025).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].team_code, "BOS");
        assert_eq!(stored[1].team_code, "NYK");
        assert!(standings_for_season(&db, 2024).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rescrape_replaces_rather_than_duplicates() {
        let db = crate::database_ops::db::test_db().await;
        persist_standings(&db, &[row("BOS", 52, 0.634)]).await.unwrap();
        persist_standings(&db, &[row("BOS", 53, 0.646)]).await.unwrap();

        let stored = standings_for_season(&db, 2025).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].wins, 53);
    }
}
