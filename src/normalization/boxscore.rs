use chrono::{DateTime, Utc};
use serde_json::Value;

use super::coerce::extract_numeric;

/// Position-sort code upstream reserves for the team-total pseudo row.
pub const TEAM_TOTAL_POSITION_SORT: i64 = 4;

/// Display name carried by the team-total pseudo row.
const TEAM_TOTAL_NAME: &str = "Game Total";

/// A made/attempted pair with its derived shooting percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShootingLine {
    pub made: i64,
    pub attempted: i64,
    pub percentage: f64,
}

impl ShootingLine {
    /// Parse an upstream `"made-attempted"` string such as `"7-15"`.
    ///
    /// Returns `None` unless splitting on `-` yields exactly two integer
    /// parts. The percentage is 0 when nothing was attempted, never a
    /// division error.
    pub fn from_split(raw: &Value) -> Option<Self> {
        let text = raw.as_str()?;
        let parts: Vec<&str> = text.split('-').collect();
        if parts.len() != 2 {
            return None;
        }
        let made = parts[0].trim().parse::<i64>().ok()?;
        let attempted = parts[1].trim().parse::<i64>().ok()?;
        Some(Self::from_parts(made, attempted))
    }

    /// Build a line from raw counts, deriving the percentage.
    pub fn from_parts(made: i64, attempted: i64) -> Self {
        let percentage = if attempted > 0 {
            round1(made as f64 / attempted as f64 * 100.0)
        } else {
            0.0
        };
        Self {
            made,
            attempted,
            percentage,
        }
    }
}

/// One player's box-score line for one game.
///
/// There is no stored rebound total; [`PlayerGameStat::total_rebounds`]
/// always derives it from the offensive and defensive components, so an
/// upstream-reported total can never disagree with the parts.
#[derive(Debug, Clone)]
pub struct PlayerGameStat {
    pub player_id: i64,
    pub game_id: i64,
    pub team_id: i64,
    pub player_name: String,
    pub player_name_short: Option<String>,
    pub position: Option<String>,
    pub position_sort: i64,
    pub minutes: i64,
    pub points: i64,
    pub field_goals: Option<ShootingLine>,
    pub three_pointers: Option<ShootingLine>,
    pub free_throws: Option<ShootingLine>,
    pub offensive_rebounds: i64,
    pub defensive_rebounds: i64,
    pub assists: i64,
    pub steals: i64,
    pub blocks: i64,
    pub turnovers: i64,
    pub personal_fouls: i64,
    pub technical_fouls: i64,
    pub ejected: i64,
    /// Derived rating, absent until the backfill pass computes it.
    pub player_rating: Option<f64>,
    pub scraped_at: DateTime<Utc>,
}

impl PlayerGameStat {
    pub fn total_rebounds(&self) -> i64 {
        self.offensive_rebounds + self.defensive_rebounds
    }
}

/// One team's aggregate line for one game, sourced from the upstream
/// team-total pseudo row rather than summed client side.
#[derive(Debug, Clone)]
pub struct TeamGameStat {
    pub game_id: i64,
    pub team_id: i64,
    pub minutes: i64,
    pub points: i64,
    pub field_goals: ShootingLine,
    pub three_pointers: ShootingLine,
    pub free_throws: ShootingLine,
    pub offensive_rebounds: i64,
    pub defensive_rebounds: i64,
    pub assists: i64,
    pub steals: i64,
    pub blocks: i64,
    pub turnovers: i64,
    pub personal_fouls: i64,
    pub scraped_at: DateTime<Utc>,
}

impl TeamGameStat {
    pub fn total_rebounds(&self) -> i64 {
        self.offensive_rebounds + self.defensive_rebounds
    }
}

/// Normalize one upstream box-score payload for a (game, team) pair.
///
/// Placeholder rows with a zero player id and rows without a usable display
/// name are dropped. The sentinel team-total row is routed to the returned
/// [`TeamGameStat`] instead of the player list. Malformed individual fields
/// degrade to defaults rather than dropping the row.
pub fn normalize_payload(
    raw_rows: &[Value],
    game_id: i64,
    team_id: i64,
) -> (Vec<PlayerGameStat>, Option<TeamGameStat>) {
    let now = Utc::now();
    let players = raw_rows
        .iter()
        .filter_map(|row| player_row(row, game_id, team_id, now))
        .collect();
    let team_total = extract_team_totals(raw_rows, game_id, team_id);
    (players, team_total)
}

/// Scan a payload for the sentinel team-total row; `None` when absent.
pub fn extract_team_totals(
    raw_rows: &[Value],
    game_id: i64,
    team_id: i64,
) -> Option<TeamGameStat> {
    let now = Utc::now();
    raw_rows.iter().find_map(|row| {
        let is_total = num(row, "positionSort") == TEAM_TOTAL_POSITION_SORT
            && row.get("nameLong").and_then(Value::as_str) == Some(TEAM_TOTAL_NAME);
        if !is_total {
            return None;
        }
        Some(TeamGameStat {
            game_id,
            team_id,
            minutes: num(row, "minutes"),
            points: num(row, "points"),
            field_goals: total_line(row, "fg"),
            three_pointers: total_line(row, "pt3"),
            free_throws: total_line(row, "ft"),
            offensive_rebounds: num(row, "oreb"),
            defensive_rebounds: num(row, "dreb"),
            assists: num(row, "ast"),
            steals: num(row, "stl"),
            blocks: num(row, "blk"),
            turnovers: num(row, "turnovers"),
            personal_fouls: num(row, "personalFouls"),
            scraped_at: now,
        })
    })
}

fn player_row(
    row: &Value,
    game_id: i64,
    team_id: i64,
    now: DateTime<Utc>,
) -> Option<PlayerGameStat> {
    let player_id = num(row, "playerID");
    let position_sort = num(row, "positionSort");
    let name = row.get("nameLong").and_then(Value::as_str).unwrap_or("");

    // Placeholder rows carry a zero id; the total row masquerades as a player.
    if (player_id == 0 && position_sort != TEAM_TOTAL_POSITION_SORT)
        || name.is_empty()
        || name == TEAM_TOTAL_NAME
    {
        return None;
    }

    Some(PlayerGameStat {
        player_id,
        game_id,
        team_id,
        player_name: name.to_string(),
        player_name_short: text(row, "nameShort"),
        position: text(row, "position"),
        position_sort,
        minutes: num(row, "minutes"),
        points: num(row, "points"),
        field_goals: row.get("fg").and_then(ShootingLine::from_split),
        three_pointers: row.get("pt3").and_then(ShootingLine::from_split),
        free_throws: row.get("ft").and_then(ShootingLine::from_split),
        offensive_rebounds: num(row, "oreb"),
        defensive_rebounds: num(row, "dreb"),
        assists: num(row, "ast"),
        steals: num(row, "stl"),
        blocks: num(row, "blk"),
        turnovers: num(row, "turnovers"),
        personal_fouls: num(row, "personalFouls"),
        technical_fouls: num(row, "technicalFouls"),
        ejected: num(row, "ejected"),
        player_rating: None,
        scraped_at: now,
    })
}

fn num(row: &Value, key: &str) -> i64 {
    row.get(key).map(extract_numeric).unwrap_or(0)
}

fn text(row: &Value, key: &str) -> Option<String> {
    row.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn total_line(row: &Value, key: &str) -> ShootingLine {
    row.get(key)
        .and_then(ShootingLine::from_split)
        .unwrap_or_else(|| ShootingLine::from_parts(0, 0))
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
