use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::coerce::{to_float, to_int};

/// One team's standings line for a season, combining the division table
/// with the seed and games-back columns of the conference table.
#[derive(Debug, Clone, Serialize)]
pub struct StandingRow {
    pub season: i64,
    pub team_name: String,
    pub team_code: String,
    pub conference: String,
    pub division: String,
    pub wins: i64,
    pub losses: i64,
    pub win_percentage: f64,
    pub points_for_per_game: f64,
    pub points_against_per_game: f64,
    pub point_differential: f64,
    pub home_record: String,
    pub away_record: String,
    pub conference_record: String,
    pub division_record: String,
    pub last_ten_record: String,
    pub streak: String,
    /// Absent when the team is missing from the conference table.
    pub conference_seed: Option<i64>,
    pub games_back: Option<f64>,
    pub scraped_at: DateTime<Utc>,
}

/// Flatten a standings-page payload into one row per team.
///
/// `basicStandings` (conference -> division -> teams) is the spine;
/// `conferenceStandings` is joined by the short team code to pick up seed
/// and games back. Teams without a conference entry keep those fields
/// empty rather than being dropped.
pub fn normalize_standings(payload: &Value, season: i64) -> Vec<StandingRow> {
    let now = Utc::now();
    let seeds = conference_index(payload);

    let mut rows = Vec::new();
    for conference in list(payload.get("basicStandings"), "conferences") {
        let conference_name = str_of(conference, "name");
        for division in list(Some(conference), "divisions") {
            let division_name = str_of(division, "name");
            for team in list(Some(division), "teams") {
                let team_code = str_of(team, "teamNameShort");
                let (conference_seed, games_back) = seeds
                    .get(team_code.as_str())
                    .copied()
                    .unwrap_or((None, None));
                rows.push(StandingRow {
                    season,
                    team_name: str_of(team, "teamName"),
                    team_code,
                    conference: conference_name.clone(),
                    division: division_name.clone(),
                    wins: int_of(team, "wins"),
                    losses: int_of(team, "losses"),
                    win_percentage: float_of(team, "winPercentage"),
                    points_for_per_game: float_of(team, "pointsForPerGame"),
                    points_against_per_game: float_of(team, "pointsAgainstPerGame"),
                    point_differential: float_of(team, "pointDifferential"),
                    home_record: str_of(team, "homeRecord"),
                    away_record: str_of(team, "awayRecord"),
                    conference_record: str_of(team, "conferenceRecord"),
                    division_record: str_of(team, "divisionRecord"),
                    last_ten_record: str_of(team, "lastTenRecord"),
                    streak: str_of(team, "streak"),
                    conference_seed,
                    games_back,
                    scraped_at: now,
                });
            }
        }
    }
    rows
}

type SeedEntry = (Option<i64>, Option<f64>);

fn conference_index(payload: &Value) -> HashMap<&str, SeedEntry> {
    let mut index = HashMap::new();
    for conference in list(payload.get("conferenceStandings"), "conferences") {
        for team in list(Some(conference), "teams") {
            let Some(code) = team.get("teamNameShort").and_then(Value::as_str) else {
                continue;
            };
            index.insert(
                code,
                (
                    to_int(team.get("conferenceSeed").unwrap_or(&Value::Null)),
                    to_float(team.get("gamesBack").unwrap_or(&Value::Null)),
                ),
            );
        }
    }
    index
}

fn list<'a>(node: Option<&'a Value>, key: &str) -> &'a [Value] {
    node.and_then(|n| n.get(key))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn str_of(node: &Value, key: &str) -> String {
    node.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn int_of(node: &Value, key: &str) -> i64 {
    node.get(key).and_then(|v| to_int(v)).unwrap_or(0)
}

fn float_of(node: &Value, key: &str) -> f64 {
    node.get(key).and_then(|v| to_float(v)).unwrap_or(0.0)
}
