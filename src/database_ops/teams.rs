use anyhow::Result;
use sqlx::types::Json;
use tracing::info;

use crate::database_ops::db::Db;
use crate::normalization::roster::RosterEntry;

/// Latest-wins upsert keyed on (team_code, player_id). The three stat
/// groups ride along as JSON columns.
pub async fn upsert_roster_entry(db: &Db, entry: &RosterEntry) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO roster (
            team_code, player_id, player_url, name_long, name_short, position,
            jersey, height_inches, height, weight, draft, school, age,
            totals, per_game, extras, scraped_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.team_code)
    .bind(entry.player_id)
    .bind(&entry.player_url)
    .bind(&entry.name_long)
    .bind(&entry.name_short)
    .bind(&entry.position)
    .bind(&entry.jersey)
    .bind(entry.height_inches)
    .bind(&entry.height)
    .bind(&entry.weight)
    .bind(&entry.draft)
    .bind(&entry.school)
    .bind(entry.age)
    .bind(Json(&entry.totals))
    .bind(Json(&entry.per_game))
    .bind(Json(&entry.extras))
    .bind(entry.scraped_at)
    .execute(&db.pool)
    .await?;
    Ok(())
}

/// Persist a whole normalized roster. Row errors abort the team; the caller
/// records the failure and continues with the next team code.
pub async fn persist_roster(db: &Db, entries: &[RosterEntry]) -> Result<usize> {
    for entry in entries {
        upsert_roster_entry(db, entry).await?;
    }
    if let Some(first) = entries.first() {
        info!(team = %first.team_code, players = entries.len(), "persisted roster");
    }
    Ok(entries.len())
}

/// Every player id appearing on any stored roster. Feeds the player sweep.
pub async fn roster_player_ids(db: &Db) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT DISTINCT player_id FROM roster ORDER BY player_id")
        .fetch_all(&db.pool)
        .await?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::db::test_db;
    use crate::normalization::roster::normalize_roster;
    use serde_json::json;

    fn entries() -> Vec<RosterEntry> {
        let payload = json!({
            "bio": [
                {"playerID": "3446", "nameLong": "Jayson Tatum", "nameShort": "J. Tatum",
                 "position": "F", "jersey": "0", "age": "27"},
                {"playerID": "4158", "nameLong": "Jaylen Brown", "nameShort": "J. Brown",
                 "position": "G-F", "jersey": "7", "age": "28"}
            ],
            "totals": [
                {"playerID": "3446", "games": "74", "points": "2225", "treb": "603"}
            ],
            "perGame": [
                {"playerID": "3446", "points": "30.1", "rebounds": "8.1"}
            ],
            "other": []
        });
        normalize_roster(&payload, "BOS")
    }

    #[tokio::test]
    async fn roster_upsert_round_trips_json_groups() {
        let db = test_db().await;
        let saved = persist_roster(&db, &entries()).await.unwrap();
        assert_eq!(saved, 2);

        let totals_json: String =
            sqlx::query_scalar("SELECT totals FROM roster WHERE player_id = 3446")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        let totals: serde_json::Value = serde_json::from_str(&totals_json).unwrap();
        assert_eq!(totals["points"], json!(2225));
        assert_eq!(totals["total_rebounds"], json!(603));
    }

    #[tokio::test]
    async fn rescrape_keeps_one_row_per_player() {
        let db = test_db().await;
        persist_roster(&db, &entries()).await.unwrap();
        persist_roster(&db, &entries()).await.unwrap();

        let ids = roster_player_ids(&db).await.unwrap();
        assert_eq!(ids, vec![3446, 4158]);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM roster WHERE team_code = 'BOS'")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(count, 2);
    }
}
