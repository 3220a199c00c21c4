// Rotowire ingestion: box scores, player pages, rosters, standings.
// provider.rs owns the HTTP client; the drivers here pace, gate, and persist.

pub mod provider;

pub use provider::RotowireProvider;

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Result};
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::database_ops::boxscores::persist_batch;
use crate::database_ops::db::Db;
use crate::database_ops::players::persist_player_page;
use crate::database_ops::scrape_log::{
    last_attempt_succeeded, player_entity, record_scrape_attempt, standings_entity, team_entity,
};
use crate::database_ops::standings::persist_standings;
use crate::database_ops::teams::persist_roster;
use crate::normalization::boxscore::normalize_payload;
use crate::normalization::player::{has_nba_seasons, normalize_player_page};
use crate::normalization::roster::normalize_roster;
use crate::normalization::standings::normalize_standings;
use crate::util::env::env_parse;
use crate::util::retry::{fetch_with_retry, FetchError, RetryPolicy};

/// Roster page codes for all thirty teams.
pub const TEAM_CODES: [&str; 30] = [
    "ATL", "BOS", "BKN", "CHA", "CHI", "CLE", "DAL", "DEN", "DET", "GSW", "HOU", "IND", "LAC",
    "LAL", "MEM", "MIA", "MIL", "MIN", "NOP", "NYK", "OKC", "ORL", "PHI", "PHX", "POR", "SAC",
    "SAS", "TOR", "UTA", "WAS",
];

/// Global team ids the box-score endpoint understands. Ids 1 through 29 cover
/// the older franchises; the thirtieth sits apart at 5312.
fn team_ids() -> impl Iterator<Item = i64> {
    (1..=29).chain(std::iter::once(5312))
}

/// Counters for one scrape pass. Which fields move depends on the driver.
#[derive(Debug, Default)]
pub struct ScrapeSummary {
    pub games_scraped: usize,
    pub games_skipped: usize,
    pub games_empty: usize,
    pub player_rows: usize,
    pub team_rows: usize,
    pub players_synced: usize,
    pub players_skipped: usize,
    pub players_failed: usize,
    pub rosters_synced: usize,
    pub rosters_failed: usize,
    pub roster_rows: usize,
    pub standings_rows: usize,
}

/// Sleep between upstream requests. Env: SCRAPE_DELAY_MS (default 1500),
/// plus up to a third again in jitter so the cadence never looks mechanical.
async fn pace() {
    let base = env_parse("SCRAPE_DELAY_MS", 1500u64);
    let jitter = rand::thread_rng().gen_range(0..=base / 3);
    tokio::time::sleep(Duration::from_millis(base + jitter)).await;
}

/// Game ids already stored with both teams. Games stored with only one team
/// stay eligible for another pass.
async fn complete_game_ids(db: &Db) -> Result<HashSet<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT game_id FROM game_info WHERE teams_found >= 2")
        .fetch_all(&db.pool)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Walk game ids from `newest` down through `oldest`, asking every team id
/// for its box score rows. Games already stored with both teams are skipped
/// unless `force` is set.
#[instrument(skip(db, provider))]
pub async fn scrape_game_range(
    db: &Db,
    provider: &RotowireProvider,
    newest: i64,
    oldest: i64,
    force: bool,
) -> Result<ScrapeSummary> {
    let policy = RetryPolicy::from_env();
    let mut summary = ScrapeSummary::default();
    let complete = if force {
        HashSet::new()
    } else {
        complete_game_ids(db).await?
    };

    for game_id in (oldest..=newest).rev() {
        if complete.contains(&game_id) {
            debug!(game_id, "already stored with both teams, skipping");
            summary.games_skipped += 1;
            continue;
        }

        let mut players = Vec::new();
        let mut teams = Vec::new();
        let mut teams_seen = 0;
        for team_id in team_ids() {
            let label = format!("box score {game_id}/{team_id}");
            match fetch_with_retry(&label, &policy, || provider.fetch_box_score(game_id, team_id))
                .await
            {
                Ok(rows) => {
                    let (mut stats, team_total) = normalize_payload(&rows, game_id, team_id);
                    players.append(&mut stats);
                    teams.extend(team_total);
                    teams_seen += 1;
                }
                Err(FetchError::NotFound(_) | FetchError::EmptyPayload(_)) => {}
                Err(err) => {
                    warn!(game_id, team_id, error = %err, "box score fetch failed, moving on");
                }
            }
            pace().await;
            // Two teams play a game; once both have answered there is
            // nothing left to ask the remaining ids for.
            if teams_seen == 2 {
                break;
            }
        }

        if players.is_empty() && teams.is_empty() {
            debug!(game_id, "no box score rows from any team");
            summary.games_empty += 1;
            continue;
        }

        let outcome = persist_batch(db, &players, &teams).await?;
        summary.games_scraped += 1;
        summary.player_rows += outcome.saved_players;
        summary.team_rows += outcome.saved_teams;
    }

    info!(
        games = summary.games_scraped,
        skipped = summary.games_skipped,
        empty = summary.games_empty,
        player_rows = summary.player_rows,
        "rotowire: game range complete"
    );
    Ok(summary)
}

/// Sweep a game id range and report which ids have box score data at all,
/// without writing anything. Useful for finding a season's id boundaries.
#[instrument(skip(provider))]
pub async fn probe_game_ids(
    provider: &RotowireProvider,
    newest: i64,
    oldest: i64,
) -> Result<Vec<i64>> {
    let policy = RetryPolicy::from_env();
    let mut valid = Vec::new();

    for game_id in (oldest..=newest).rev() {
        let mut found = false;
        for team_id in team_ids() {
            let label = format!("probe {game_id}/{team_id}");
            match fetch_with_retry(&label, &policy, || provider.fetch_box_score(game_id, team_id))
                .await
            {
                Ok(_) => found = true,
                Err(FetchError::NotFound(_) | FetchError::EmptyPayload(_)) => {}
                Err(err) => warn!(game_id, team_id, error = %err, "probe fetch failed"),
            }
            pace().await;
            if found {
                break;
            }
        }
        if found {
            info!(game_id, "game id has data");
            valid.push(game_id);
        }
    }

    info!(
        probed = (newest - oldest + 1),
        valid = valid.len(),
        "rotowire: probe complete"
    );
    Ok(valid)
}

/// Fetch and store one player's full page. Players whose last attempt
/// succeeded are skipped unless `force` is set. Returns true when the page
/// was stored.
#[instrument(skip(db, provider))]
pub async fn sync_player(
    db: &Db,
    provider: &RotowireProvider,
    player_id: i64,
    force: bool,
) -> Result<bool> {
    let entity = player_entity(player_id);
    if !force && last_attempt_succeeded(db, &entity).await? {
        debug!(player_id, "player already synced, skipping");
        return Ok(false);
    }

    let policy = RetryPolicy::from_env();
    let label = format!("player {player_id}");
    let page =
        match fetch_with_retry(&label, &policy, || provider.fetch_player_page(player_id)).await {
            Ok(page) => page,
            Err(err) => {
                record_scrape_attempt(db, &entity, false, Some(&err.to_string())).await?;
                return Err(err.into());
            }
        };

    if !has_nba_seasons(&page) {
        // Nothing to store for college-only pages; mark them done so the
        // sweep does not knock on the same door every run.
        info!(player_id, "no NBA seasons on player page");
        record_scrape_attempt(db, &entity, true, None).await?;
        return Ok(false);
    }

    let normalized = normalize_player_page(&page, player_id);
    match persist_player_page(db, &normalized).await {
        Ok(()) => {
            record_scrape_attempt(db, &entity, true, None).await?;
            Ok(true)
        }
        Err(err) => {
            record_scrape_attempt(db, &entity, false, Some(&err.to_string())).await?;
            Err(err)
        }
    }
}

/// Sync a batch of players, pacing between pages. Individual failures are
/// counted without stopping the sweep.
#[instrument(skip(db, provider, player_ids), fields(players = player_ids.len()))]
pub async fn sync_players(
    db: &Db,
    provider: &RotowireProvider,
    player_ids: &[i64],
    force: bool,
) -> Result<ScrapeSummary> {
    let mut summary = ScrapeSummary::default();

    for &player_id in player_ids {
        // Checked here as well so skips do not pay the pacing delay.
        if !force && last_attempt_succeeded(db, &player_entity(player_id)).await? {
            summary.players_skipped += 1;
            continue;
        }
        match sync_player(db, provider, player_id, force).await {
            Ok(true) => summary.players_synced += 1,
            Ok(false) => summary.players_skipped += 1,
            Err(err) => {
                summary.players_failed += 1;
                warn!(player_id, error = %err, "player sync failed");
            }
        }
        pace().await;
    }

    info!(
        synced = summary.players_synced,
        skipped = summary.players_skipped,
        failed = summary.players_failed,
        "rotowire: player sweep complete"
    );
    Ok(summary)
}

/// Fetch and store one team's roster. Returns the number of players stored.
#[instrument(skip(db, provider))]
pub async fn sync_roster(
    db: &Db,
    provider: &RotowireProvider,
    team_code: &str,
    force: bool,
) -> Result<usize> {
    let entity = team_entity(team_code);
    if !force && last_attempt_succeeded(db, &entity).await? {
        debug!(team_code, "roster already synced, skipping");
        return Ok(0);
    }

    let policy = RetryPolicy::from_env();
    let label = format!("roster {team_code}");
    let payload = match fetch_with_retry(&label, &policy, || provider.fetch_roster(team_code)).await
    {
        Ok(payload) => payload,
        Err(err) => {
            record_scrape_attempt(db, &entity, false, Some(&err.to_string())).await?;
            return Err(err.into());
        }
    };

    let entries = normalize_roster(&payload, team_code);
    if entries.is_empty() {
        record_scrape_attempt(db, &entity, false, Some("no usable roster rows")).await?;
        bail!("roster {team_code}: payload had no usable rows");
    }

    match persist_roster(db, &entries).await {
        Ok(stored) => {
            record_scrape_attempt(db, &entity, true, None).await?;
            Ok(stored)
        }
        Err(err) => {
            record_scrape_attempt(db, &entity, false, Some(&err.to_string())).await?;
            Err(err)
        }
    }
}

/// Sweep all thirty rosters, pacing between teams.
#[instrument(skip(db, provider))]
pub async fn sync_rosters(
    db: &Db,
    provider: &RotowireProvider,
    force: bool,
) -> Result<ScrapeSummary> {
    let mut summary = ScrapeSummary::default();

    for team_code in TEAM_CODES {
        if !force && last_attempt_succeeded(db, &team_entity(team_code)).await? {
            debug!(team_code, "roster already synced, skipping");
            continue;
        }
        match sync_roster(db, provider, team_code, force).await {
            Ok(stored) => {
                summary.rosters_synced += 1;
                summary.roster_rows += stored;
            }
            Err(err) => {
                summary.rosters_failed += 1;
                warn!(team_code, error = %err, "roster sync failed");
            }
        }
        pace().await;
    }

    info!(
        rosters = summary.rosters_synced,
        failed = summary.rosters_failed,
        players = summary.roster_rows,
        "rotowire: roster sweep complete"
    );
    Ok(summary)
}

/// Fetch and store the league standings for one season year. Returns the
/// number of team rows stored.
#[instrument(skip(db, provider))]
pub async fn sync_standings(
    db: &Db,
    provider: &RotowireProvider,
    season: i64,
    force: bool,
) -> Result<usize> {
    let entity = standings_entity(season);
    if !force && last_attempt_succeeded(db, &entity).await? {
        debug!(season, "standings already synced, skipping");
        return Ok(0);
    }

    let policy = RetryPolicy::from_env();
    let label = format!("standings {season}");
    let payload = match fetch_with_retry(&label, &policy, || provider.fetch_standings(season)).await
    {
        Ok(payload) => payload,
        Err(err) => {
            record_scrape_attempt(db, &entity, false, Some(&err.to_string())).await?;
            return Err(err.into());
        }
    };

    let rows = normalize_standings(&payload, season);
    if rows.is_empty() {
        record_scrape_attempt(db, &entity, false, Some("no standings rows")).await?;
        bail!("standings {season}: payload had no rows");
    }

    match persist_standings(db, &rows).await {
        Ok(stored) => {
            record_scrape_attempt(db, &entity, true, None).await?;
            info!(season, teams = stored, "rotowire: standings sync complete");
            Ok(stored)
        }
        Err(err) => {
            record_scrape_attempt(db, &entity, false, Some(&err.to_string())).await?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::db::test_db;

    #[test]
    fn team_id_sweep_covers_thirty_teams() {
        let ids: Vec<i64> = team_ids().collect();
        assert_eq!(ids.len(), 30);
        assert_eq!(ids[0], 1);
        assert_eq!(ids[29], 5312);

        let unique: HashSet<&str> = TEAM_CODES.iter().copied().collect();
        assert_eq!(unique.len(), 30);
    }

    #[tokio::test]
    async fn synced_player_is_skipped_without_force() {
        let db = test_db().await;
        record_scrape_attempt(&db, &player_entity(3446), true, None)
            .await
            .unwrap();

        let provider = RotowireProvider::new();
        let stored = sync_player(&db, &provider, 3446, false).await.unwrap();
        assert!(!stored);
    }

    #[tokio::test]
    async fn synced_roster_is_skipped_without_force() {
        let db = test_db().await;
        record_scrape_attempt(&db, &team_entity("BOS"), true, None)
            .await
            .unwrap();

        let provider = RotowireProvider::new();
        let stored = sync_roster(&db, &provider, "BOS", false).await.unwrap();
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn synced_standings_are_skipped_without_force() {
        let db = test_db().await;
        record_scrape_attempt(&db, &standings_entity(2025), true, None)
            .await
            .unwrap();

        let provider = RotowireProvider::new();
        let stored = sync_standings(&db, &provider, 2025, false).await.unwrap();
        assert_eq!(stored, 0);
    }
}
