use anyhow::Context;
use reqwest::header::REFERER;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use crate::util::env::{env_opt, env_parse};
use crate::util::retry::{check_status, FetchError};

const DEFAULT_BASE_URL: &str = "https://www.rotowire.com/basketball";

/// The ajax endpoints refuse requests that do not look like the site's own
/// front end, so every call carries a browser user agent.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Some player pages come back without their stat blocks unless the request
/// names a team. Any valid team code works; this one is arbitrary.
const FALLBACK_TEAM: &str = "GSW";

pub struct RotowireProvider {
    client: Client,
    base_url: String,
}

impl RotowireProvider {
    /// Env: ROTOWIRE_BASE_URL, ROTOWIRE_HTTP_TIMEOUT_SECS (default 15).
    pub fn new() -> Self {
        let timeout = env_parse("ROTOWIRE_HTTP_TIMEOUT_SECS", 15u64);
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .user_agent(BROWSER_UA)
            .build()
            .unwrap_or_else(|_| Client::new());
        let base_url = env_opt("ROTOWIRE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        Self { client, base_url }
    }

    async fn send_json(&self, request: RequestBuilder, what: &str) -> Result<Value, FetchError> {
        let response = request
            .send()
            .await
            .with_context(|| format!("requesting {what}"))?;
        check_status(response.status(), what)?;
        let value = response
            .json::<Value>()
            .await
            .with_context(|| format!("decoding {what}"))?;
        Ok(value)
    }

    async fn get_json(&self, url: &str, what: &str) -> Result<Value, FetchError> {
        self.send_json(self.client.get(url), what).await
    }

    /// One team's box-score rows for one game. An empty array means the team
    /// did not play in that game (or the game id does not exist).
    pub async fn fetch_box_score(
        &self,
        game_id: i64,
        team_id: i64,
    ) -> Result<Vec<Value>, FetchError> {
        let url = format!(
            "{}/tables/box-score.php?gameGlobalID={}&teamGlobalID={}",
            self.base_url, game_id, team_id
        );
        let what = format!("box score game {game_id} team {team_id}");
        match self.get_json(&url, &what).await? {
            Value::Array(rows) if !rows.is_empty() => Ok(rows),
            _ => Err(FetchError::EmptyPayload(what)),
        }
    }

    /// Full player page: seasons, game logs, advanced stats, ratings, splits.
    pub async fn fetch_player_page(&self, player_id: i64) -> Result<Value, FetchError> {
        let url = format!(
            "{}/ajax/player-page-data.php?id={}&nba=true",
            self.base_url, player_id
        );
        let what = format!("player page {player_id}");
        let page = self.get_json(&url, &what).await?;
        if page.get("basic").is_some() {
            return Ok(page);
        }

        debug!(player_id, "player page missing basic block, retrying with team hint");
        let retry_url = format!("{url}&team={FALLBACK_TEAM}");
        let page = self.get_json(&retry_url, &what).await?;
        if page.get("basic").is_some() {
            Ok(page)
        } else {
            Err(FetchError::EmptyPayload(what))
        }
    }

    pub async fn fetch_roster(&self, team_code: &str) -> Result<Value, FetchError> {
        let url = format!(
            "{}/ajax/team-page-roster-data.php?team={}",
            self.base_url, team_code
        );
        let what = format!("roster {team_code}");
        let payload = self.get_json(&url, &what).await?;
        let has_bio = payload
            .get("bio")
            .and_then(Value::as_array)
            .map(|rows| !rows.is_empty())
            .unwrap_or(false);
        if has_bio {
            Ok(payload)
        } else {
            Err(FetchError::EmptyPayload(what))
        }
    }

    /// The standings endpoint also checks the ajax marker and referer, not
    /// just the user agent.
    pub async fn fetch_standings(&self, season: i64) -> Result<Value, FetchError> {
        let url = format!(
            "{}/ajax/standings-page-data.php?season={}",
            self.base_url, season
        );
        let what = format!("standings {season}");
        let request = self
            .client
            .get(&url)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(REFERER, format!("{}/standings.php", self.base_url));
        let payload = self.send_json(request, &what).await?;
        if payload.get("basicStandings").is_some() {
            Ok(payload)
        } else {
            Err(FetchError::EmptyPayload(what))
        }
    }
}
