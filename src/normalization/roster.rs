use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::coerce::{to_float, to_int};

/// Season totals from the roster page's totals block.
///
/// Totals trust the upstream rebound total as sent; box-score rows are the
/// ones that recompute theirs from the offensive and defensive counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RosterTotals {
    pub games: Option<i64>,
    pub minutes: Option<i64>,
    pub field_goals_pct: Option<f64>,
    pub three_pointers_pct: Option<f64>,
    pub free_throws_pct: Option<f64>,
    pub steals: Option<i64>,
    pub turnovers: Option<i64>,
    pub offensive_rebounds: Option<i64>,
    pub defensive_rebounds: Option<i64>,
    pub total_rebounds: Option<i64>,
    pub assists: Option<i64>,
    pub blocks: Option<i64>,
    pub fouls: Option<i64>,
    pub points: Option<i64>,
    pub fg_made: Option<i64>,
    pub fg_attempted: Option<i64>,
    pub three_pt_made: Option<i64>,
    pub three_pt_attempted: Option<i64>,
    pub ft_made: Option<i64>,
    pub ft_attempted: Option<i64>,
}

impl RosterTotals {
    fn from_row(row: &Value) -> Self {
        Self {
            games: int(row, "games"),
            minutes: int(row, "minutes"),
            field_goals_pct: float(row, "fieldGoals"),
            three_pointers_pct: float(row, "threePointers"),
            free_throws_pct: float(row, "freeThrows"),
            steals: int(row, "steals"),
            turnovers: int(row, "turnovers"),
            offensive_rebounds: int(row, "oreb"),
            defensive_rebounds: int(row, "dreb"),
            total_rebounds: int(row, "treb"),
            assists: int(row, "assists"),
            blocks: int(row, "blocks"),
            fouls: int(row, "fouls"),
            points: int(row, "points"),
            fg_made: int(row, "fgMade"),
            fg_attempted: int(row, "fgAtt"),
            three_pt_made: int(row, "3ptMade"),
            three_pt_attempted: int(row, "3ptAtt"),
            ft_made: int(row, "ftMade"),
            ft_attempted: int(row, "ftAtt"),
        }
    }
}

/// Per-game averages from the roster page's perGame block.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RosterPerGame {
    pub games: Option<i64>,
    pub minutes: Option<f64>,
    pub points: Option<f64>,
    pub rebounds: Option<f64>,
    pub assists: Option<f64>,
    pub steals: Option<f64>,
    pub blocks: Option<f64>,
    pub three_point_made: Option<f64>,
    pub turnovers: Option<f64>,
    pub fouls: Option<f64>,
}

impl RosterPerGame {
    fn from_row(row: &Value) -> Self {
        Self {
            games: int(row, "games"),
            minutes: float(row, "minutes"),
            points: float(row, "points"),
            rebounds: float(row, "rebounds"),
            assists: float(row, "assists"),
            steals: float(row, "steals"),
            blocks: float(row, "blocks"),
            three_point_made: float(row, "threepointmade"),
            turnovers: float(row, "turnovers"),
            fouls: float(row, "fouls"),
        }
    }
}

/// Miscellaneous counting stats from the roster page's other block.
/// `high_points` is a season high, not a total; the block reuses the
/// `points` key for it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RosterExtras {
    pub games_started: Option<i64>,
    pub ejected: Option<i64>,
    pub high_points: Option<i64>,
    pub triple_double: Option<i64>,
    pub double_double: Option<i64>,
    pub plus_minus: Option<i64>,
}

impl RosterExtras {
    fn from_row(row: &Value) -> Self {
        Self {
            games_started: int(row, "gs"),
            ejected: int(row, "ejected"),
            high_points: int(row, "points"),
            triple_double: int(row, "tripleDouble"),
            double_double: int(row, "doubleDouble"),
            plus_minus: int(row, "plusMinus"),
        }
    }
}

/// One player's roster line: bio fields plus the three stat blocks the
/// roster page splits across parallel tables, joined by player id.
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub team_code: String,
    pub player_id: i64,
    pub player_url: String,
    pub name_long: String,
    pub name_short: String,
    pub position: String,
    pub jersey: String,
    pub height_inches: Option<i64>,
    pub height: String,
    pub weight: String,
    pub draft: String,
    pub school: String,
    pub age: Option<i64>,
    pub totals: RosterTotals,
    pub per_game: RosterPerGame,
    pub extras: RosterExtras,
    pub scraped_at: DateTime<Utc>,
}

/// Join a roster payload's four blocks into one entry per player.
///
/// The bio block is the spine; a bio row without a usable player id is
/// dropped. Stat blocks that lack a row for a player leave that group at
/// its empty default instead of dropping the player.
pub fn normalize_roster(payload: &Value, team_code: &str) -> Vec<RosterEntry> {
    let now = Utc::now();
    let totals = index_by_player(block(payload, "totals"));
    let per_game = index_by_player(block(payload, "perGame"));
    let extras = index_by_player(block(payload, "other"));

    block(payload, "bio")
        .iter()
        .filter_map(|row| {
            let player_id = to_int(row.get("playerID").unwrap_or(&Value::Null))?;
            Some(RosterEntry {
                team_code: team_code.to_string(),
                player_id,
                player_url: text(row, "playerURL"),
                name_long: text(row, "nameLong"),
                name_short: text(row, "nameShort"),
                position: text(row, "position"),
                jersey: text(row, "jersey"),
                height_inches: int(row, "heightInches"),
                height: text(row, "height"),
                weight: text(row, "weight"),
                draft: text(row, "draft"),
                school: text(row, "school"),
                age: int(row, "age"),
                totals: totals
                    .get(&player_id)
                    .map(|r| RosterTotals::from_row(r))
                    .unwrap_or_default(),
                per_game: per_game
                    .get(&player_id)
                    .map(|r| RosterPerGame::from_row(r))
                    .unwrap_or_default(),
                extras: extras
                    .get(&player_id)
                    .map(|r| RosterExtras::from_row(r))
                    .unwrap_or_default(),
                scraped_at: now,
            })
        })
        .collect()
}

fn block<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn index_by_player(rows: &[Value]) -> HashMap<i64, &Value> {
    rows.iter()
        .filter_map(|row| {
            let id = to_int(row.get("playerID").unwrap_or(&Value::Null))?;
            Some((id, row))
        })
        .collect()
}

fn text(row: &Value, key: &str) -> String {
    row.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn int(row: &Value, key: &str) -> Option<i64> {
    to_int(row.get(key).unwrap_or(&Value::Null))
}

fn float(row: &Value, key: &str) -> Option<f64> {
    to_float(row.get(key).unwrap_or(&Value::Null))
}
