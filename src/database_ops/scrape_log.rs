use anyhow::Result;
use chrono::Utc;

use crate::database_ops::db::Db;

// Entity keys share one table; the prefix keeps the namespaces apart.

pub fn player_entity(player_id: i64) -> String {
    format!("player:{player_id}")
}

pub fn team_entity(team_code: &str) -> String {
    format!("team:{team_code}")
}

pub fn standings_entity(season: i64) -> String {
    format!("standings:{season}")
}

/// Record the outcome of a scrape attempt, overwriting any earlier outcome
/// for the same entity.
pub async fn record_scrape_attempt(
    db: &Db,
    entity: &str,
    success: bool,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO scraping_log (entity, success, error_message, scraped_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(entity)
    .bind(success)
    .bind(error)
    .bind(Utc::now())
    .execute(&db.pool)
    .await?;
    Ok(())
}

/// True only when the most recent attempt for this entity succeeded. A
/// failed attempt does not count as done, so the next sweep retries it.
pub async fn last_attempt_succeeded(db: &Db, entity: &str) -> Result<bool> {
    let success: Option<bool> =
        sqlx::query_scalar("SELECT success FROM scraping_log WHERE entity = ?")
            .bind(entity)
            .fetch_optional(&db.pool)
            .await?;
    Ok(success.unwrap_or(false))
}
