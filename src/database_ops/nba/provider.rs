use anyhow::Context;
use reqwest::header::{ACCEPT, REFERER};
use reqwest::Client;
use serde_json::Value;

use crate::util::env::{env_opt, env_parse};
use crate::util::retry::{check_status, FetchError};

const DEFAULT_STATS_BASE_URL: &str = "https://stats.nba.com/stats";
const DEFAULT_CDN_BASE_URL: &str = "https://cdn.nba.com/static/json/liveData";

/// stats.nba.com drops requests that do not present browser headers.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// League game ids carry a "00" league prefix and run ten characters.
pub fn is_valid_game_id(game_id: &str) -> bool {
    game_id.starts_with("00") && game_id.len() == 10
}

pub struct NbaProvider {
    client: Client,
    stats_base_url: String,
    cdn_base_url: String,
}

impl NbaProvider {
    /// Env: NBA_API_BASE_URL, NBA_CDN_BASE_URL, NBA_HTTP_TIMEOUT_SECS
    /// (default 15).
    pub fn new() -> Self {
        let timeout = env_parse("NBA_HTTP_TIMEOUT_SECS", 15u64);
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .user_agent(BROWSER_UA)
            .build()
            .unwrap_or_else(|_| Client::new());
        let stats_base_url =
            env_opt("NBA_API_BASE_URL").unwrap_or_else(|| DEFAULT_STATS_BASE_URL.into());
        let cdn_base_url =
            env_opt("NBA_CDN_BASE_URL").unwrap_or_else(|| DEFAULT_CDN_BASE_URL.into());
        Self {
            client,
            stats_base_url,
            cdn_base_url,
        }
    }

    /// Season-to-date results for every team, two finder rows per game.
    /// `season` takes the dashed form the stats API expects ("2025-26").
    pub async fn fetch_league_games(&self, season: &str) -> Result<Value, FetchError> {
        let url = format!("{}/leaguegamefinder", self.stats_base_url);
        let what = format!("league games {season}");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("LeagueID", "00"),
                ("Season", season),
                ("SeasonType", "Regular Season"),
                ("PlayerOrTeam", "T"),
            ])
            .header(ACCEPT, "application/json")
            .header(REFERER, "https://www.nba.com/")
            .send()
            .await
            .with_context(|| format!("requesting {what}"))?;
        check_status(response.status(), &what)?;
        let payload = response
            .json::<Value>()
            .await
            .with_context(|| format!("decoding {what}"))?;
        if payload.get("resultSets").is_some() {
            Ok(payload)
        } else {
            Err(FetchError::EmptyPayload(what))
        }
    }

    /// Live box score for one game from the static CDN. Invalid ids are
    /// rejected before any request goes out.
    pub async fn fetch_live_boxscore(&self, game_id: &str) -> Result<Value, FetchError> {
        if !is_valid_game_id(game_id) {
            return Err(FetchError::NotFound(format!("game id {game_id}")));
        }
        let url = format!("{}/boxscore/boxscore_{}.json", self.cdn_base_url, game_id);
        let what = format!("live box score {game_id}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("requesting {what}"))?;
        check_status(response.status(), &what)?;
        let payload = response
            .json::<Value>()
            .await
            .with_context(|| format!("decoding {what}"))?;
        if payload.get("game").is_some() {
            Ok(payload)
        } else {
            Err(FetchError::EmptyPayload(what))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid_game_id;

    #[test]
    fn game_id_gate() {
        assert!(is_valid_game_id("0022500306"));
        assert!(!is_valid_game_id("1022500306"));
        assert!(!is_valid_game_id("00225003"));
        assert!(!is_valid_game_id(""));
    }
}
