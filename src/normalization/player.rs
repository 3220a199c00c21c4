use chrono::{DateTime, Utc};
use serde_json::Value;

use super::coerce::{to_float, to_int};

/// Sentinel team code for college seasons, which never reach the NBA tables.
const COLLEGE_TEAM: &str = "CBB";

/// Aggregation flavor of a season-level row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatType {
    PerGame,
    Total,
    Per36,
}

impl StatType {
    pub const ALL: [StatType; 3] = [StatType::PerGame, StatType::Total, StatType::Per36];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatType::PerGame => "per_game",
            StatType::Total => "total",
            StatType::Per36 => "per_36",
        }
    }

    /// Payload key carrying season rows of this flavor.
    fn season_key(&self) -> &'static str {
        match self {
            StatType::PerGame => "basic",
            StatType::Total => "basicTotal",
            StatType::Per36 => "basicPer36",
        }
    }

    /// Payload key carrying rating rows of this flavor.
    fn rating_key(&self) -> &'static str {
        match self {
            StatType::PerGame => "nbaRatingsPerGame",
            StatType::Total => "nbaRatings",
            StatType::Per36 => "nbaRatingsPer36",
        }
    }
}

/// Which split table a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitType {
    General,
    Starter,
    Month,
    Rest,
    Opponent,
    Results,
}

impl SplitType {
    /// Payload key to split-type mapping, in upstream order.
    const BLOCKS: [(&'static str, SplitType); 6] = [
        ("splits", SplitType::General),
        ("splitsStarter", SplitType::Starter),
        ("splitsMonth", SplitType::Month),
        ("splitsRest", SplitType::Rest),
        ("splitsOpp", SplitType::Opponent),
        ("splitsResults", SplitType::Results),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitType::General => "general",
            SplitType::Starter => "starter",
            SplitType::Month => "month",
            SplitType::Rest => "rest",
            SplitType::Opponent => "opponent",
            SplitType::Results => "results",
        }
    }
}

/// Home/away flag on a game-log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeAway {
    Home,
    Away,
}

impl HomeAway {
    /// Upstream marks home games with boolean true, `"true"`, or `"1"`;
    /// every other value means away.
    fn from_flag(raw: Option<&Value>) -> Self {
        let is_home = match raw {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true" || s == "1",
            _ => false,
        };
        if is_home {
            HomeAway::Home
        } else {
            HomeAway::Away
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HomeAway::Home => "Home",
            HomeAway::Away => "Away",
        }
    }
}

/// Team and age resolved from a player's most recent NBA season.
#[derive(Debug, Clone)]
pub struct PlayerProfile {
    pub player_id: i64,
    pub team: String,
    pub current_age: Option<i64>,
    pub scraped_at: DateTime<Utc>,
}

/// The shared stat column block carried by season and split rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonAverages {
    pub games: Option<i64>,
    pub minutes: Option<f64>,
    pub points: Option<f64>,
    pub rebounds: Option<f64>,
    pub assists: Option<f64>,
    pub steals: Option<f64>,
    pub blocks: Option<f64>,
    pub three_point_made: Option<f64>,
    pub three_point_attempted: Option<f64>,
    pub three_point_percentage: Option<f64>,
    pub fg_made: Option<f64>,
    pub fg_attempted: Option<f64>,
    pub fg_percentage: Option<f64>,
    pub ft_made: Option<f64>,
    pub ft_attempted: Option<f64>,
    pub ft_percentage: Option<f64>,
    pub turnovers: Option<f64>,
    pub offensive_rebounds: Option<f64>,
    pub defensive_rebounds: Option<f64>,
}

impl SeasonAverages {
    fn from_row(row: &Value) -> Self {
        Self {
            games: to_int(field(row, "games")),
            minutes: to_float(field(row, "minutes")),
            points: to_float(field(row, "pts")),
            rebounds: to_float(field(row, "reb")),
            assists: to_float(field(row, "ast")),
            steals: to_float(field(row, "stl")),
            blocks: to_float(field(row, "blk")),
            three_point_made: to_float(field(row, "pt3m")),
            three_point_attempted: to_float(field(row, "pt3a")),
            three_point_percentage: to_float(field(row, "pt3pct")),
            fg_made: to_float(field(row, "fgm")),
            fg_attempted: to_float(field(row, "fga")),
            fg_percentage: to_float(field(row, "fgpct")),
            ft_made: to_float(field(row, "ftm")),
            ft_attempted: to_float(field(row, "fta")),
            ft_percentage: to_float(field(row, "ftpct")),
            turnovers: to_float(field(row, "to")),
            offensive_rebounds: to_float(field(row, "oreb")),
            defensive_rebounds: to_float(field(row, "dreb")),
        }
    }
}

/// One season-aggregate row, replaced wholesale on every re-scrape.
#[derive(Debug, Clone)]
pub struct SeasonStat {
    pub player_id: i64,
    pub season: String,
    pub age: Option<i64>,
    pub team: String,
    pub stat_type: StatType,
    pub line: SeasonAverages,
    pub scraped_at: DateTime<Utc>,
}

/// One game-log row for a game the player actually appeared in.
#[derive(Debug, Clone)]
pub struct GameLog {
    pub player_id: i64,
    pub game_id: Option<i64>,
    pub date: String,
    pub full_date: String,
    pub game_date: String,
    pub opponent: String,
    pub home_away: HomeAway,
    pub score: String,
    pub minutes: Option<i64>,
    pub points: Option<i64>,
    pub rebounds: Option<i64>,
    pub assists: Option<i64>,
    pub steals: Option<i64>,
    pub blocks: Option<i64>,
    pub turnovers: Option<i64>,
    pub fg_made: Option<i64>,
    pub fg_attempted: Option<i64>,
    pub ft_made: Option<i64>,
    pub ft_attempted: Option<i64>,
    pub three_point_made: Option<i64>,
    pub three_point_attempted: Option<i64>,
    pub offensive_rebounds: Option<i64>,
    pub defensive_rebounds: Option<i64>,
    pub fouls: Option<i64>,
    pub played_game: bool,
    pub scraped_at: DateTime<Utc>,
}

/// One advanced-metrics row per season.
#[derive(Debug, Clone)]
pub struct AdvancedStat {
    pub player_id: i64,
    pub season: String,
    pub team: String,
    pub games: Option<i64>,
    pub mpg: Option<f64>,
    pub true_shooting: Option<f64>,
    pub efg: Option<f64>,
    pub assist_ratio: Option<f64>,
    pub turnover_ratio: Option<f64>,
    pub ast_to_ratio: Option<f64>,
    pub efficiency: Option<f64>,
    pub scraped_at: DateTime<Utc>,
}

/// One upstream per-category rating row (distinct from the derived
/// box-score rating in [`super::rating`]).
#[derive(Debug, Clone)]
pub struct SeasonRating {
    pub player_id: i64,
    pub season: String,
    pub team: String,
    pub pts_rating: Option<f64>,
    pub reb_rating: Option<f64>,
    pub ast_rating: Option<f64>,
    pub stl_rating: Option<f64>,
    pub blk_rating: Option<f64>,
    pub pt3m_rating: Option<f64>,
    pub fgpct_rating: Option<f64>,
    pub ftpct_rating: Option<f64>,
    pub overall_rating: Option<f64>,
    pub rank: Option<i64>,
    pub rating_type: StatType,
    pub scraped_at: DateTime<Utc>,
}

/// One split row (by month, rest days, opponent, and so on).
#[derive(Debug, Clone)]
pub struct PlayerSplit {
    pub player_id: i64,
    pub split_type: SplitType,
    pub split_category: String,
    pub line: SeasonAverages,
    pub scraped_at: DateTime<Utc>,
}

/// Everything extractable from one player-page payload.
#[derive(Debug, Clone)]
pub struct PlayerPage {
    pub profile: PlayerProfile,
    pub seasons: Vec<SeasonStat>,
    pub game_logs: Vec<GameLog>,
    pub advanced: Vec<AdvancedStat>,
    pub ratings: Vec<SeasonRating>,
    pub splits: Vec<PlayerSplit>,
}

/// Whether the payload holds at least one NBA season (college-only players
/// are not worth persisting).
pub fn has_nba_seasons(data: &Value) -> bool {
    nba_body(data, "basic")
        .iter()
        .any(|row| !matches!(team_of(row).as_str(), COLLEGE_TEAM | ""))
}

/// Normalize one player-page payload into every row family it carries.
pub fn normalize_player_page(data: &Value, player_id: i64) -> PlayerPage {
    let now = Utc::now();

    let mut seasons = Vec::new();
    let mut ratings = Vec::new();
    for stat_type in StatType::ALL {
        seasons.extend(season_rows(data, player_id, stat_type, now));
        ratings.extend(rating_rows(data, player_id, stat_type, now));
    }

    PlayerPage {
        profile: extract_profile(data, player_id, now),
        seasons,
        game_logs: game_log_rows(data, player_id, now),
        advanced: advanced_rows(data, player_id, now),
        ratings,
        splits: split_rows(data, player_id, now),
    }
}

/// Resolve team and age from the most recent NBA season in the payload.
pub fn extract_profile(data: &Value, player_id: i64, now: DateTime<Utc>) -> PlayerProfile {
    let mut team = String::new();
    let mut current_age = None;

    let last_nba = nba_body(data, "basic")
        .iter()
        .filter(|row| !matches!(team_of(row).as_str(), COLLEGE_TEAM | ""))
        .next_back();
    if let Some(row) = last_nba {
        team = team_of(row);
        current_age = digit_age(row.get("age"));
    }

    PlayerProfile {
        player_id,
        team,
        current_age,
        scraped_at: now,
    }
}

fn season_rows(
    data: &Value,
    player_id: i64,
    stat_type: StatType,
    now: DateTime<Utc>,
) -> Vec<SeasonStat> {
    nba_body(data, stat_type.season_key())
        .iter()
        .filter(|row| team_of(row) != COLLEGE_TEAM)
        .map(|row| SeasonStat {
            player_id,
            season: season_of(row),
            age: digit_age(row.get("age")),
            team: team_of(row),
            stat_type,
            line: SeasonAverages::from_row(row),
            scraped_at: now,
        })
        .collect()
}

fn game_log_rows(data: &Value, player_id: i64, now: DateTime<Utc>) -> Vec<GameLog> {
    let Some(map) = data.as_object() else {
        return Vec::new();
    };

    let mut logs = Vec::new();
    for (key, block) in map {
        if !key.starts_with("gl") {
            continue;
        }
        let Some(body) = block.get("body").and_then(Value::as_array) else {
            continue;
        };
        for game in body {
            // DNP rows and rows with no player id carry no usable line.
            if game.get("min").and_then(Value::as_str) == Some("DNP")
                || !truthy(game.get("playerid"))
            {
                continue;
            }
            logs.push(GameLog {
                player_id,
                game_id: to_int(field(game, "gameid")),
                date: text_of(game, "date"),
                full_date: text_of(game, "fulldate"),
                game_date: text_of(game, "gamedate"),
                opponent: text_of(game, "opp"),
                home_away: HomeAway::from_flag(game.get("home")),
                score: text_of(game, "score"),
                minutes: to_int(field(game, "min")),
                points: to_int(field(game, "pts")),
                rebounds: to_int(field(game, "reb")),
                assists: to_int(field(game, "ast")),
                steals: to_int(field(game, "stl")),
                blocks: to_int(field(game, "blk")),
                turnovers: to_int(field(game, "to")),
                fg_made: to_int(field(game, "fgm")),
                fg_attempted: to_int(field(game, "fga")),
                ft_made: to_int(field(game, "ftm")),
                ft_attempted: to_int(field(game, "fta")),
                three_point_made: to_int(field(game, "pt3fgm")),
                three_point_attempted: to_int(field(game, "pt3fga")),
                offensive_rebounds: to_int(field(game, "oreb")),
                defensive_rebounds: to_int(field(game, "dreb")),
                fouls: to_int(field(game, "fouls")),
                played_game: truthy(game.get("playedgame")),
                scraped_at: now,
            });
        }
    }
    logs
}

fn advanced_rows(data: &Value, player_id: i64, now: DateTime<Utc>) -> Vec<AdvancedStat> {
    nba_body(data, "advanced")
        .iter()
        .map(|row| AdvancedStat {
            player_id,
            season: season_of(row),
            team: team_of(row),
            games: to_int(field(row, "games")),
            mpg: to_float(field(row, "mpg")),
            true_shooting: to_float(field(row, "trueshoot")),
            efg: to_float(field(row, "efg")),
            assist_ratio: to_float(field(row, "ar")),
            turnover_ratio: to_float(field(row, "toratio")),
            ast_to_ratio: to_float(field(row, "asttoratio")),
            efficiency: to_float(field(row, "eff")),
            scraped_at: now,
        })
        .collect()
}

fn rating_rows(
    data: &Value,
    player_id: i64,
    rating_type: StatType,
    now: DateTime<Utc>,
) -> Vec<SeasonRating> {
    nba_body(data, rating_type.rating_key())
        .iter()
        .map(|row| SeasonRating {
            player_id,
            season: season_of(row),
            team: team_of(row),
            pts_rating: to_float(field(row, "pts")),
            reb_rating: to_float(field(row, "reb")),
            ast_rating: to_float(field(row, "ast")),
            stl_rating: to_float(field(row, "stl")),
            blk_rating: to_float(field(row, "blk")),
            pt3m_rating: to_float(field(row, "pt3m")),
            fgpct_rating: to_float(field(row, "fgpct")),
            ftpct_rating: to_float(field(row, "ftpct")),
            overall_rating: to_float(field(row, "overall")),
            rank: to_int(field(row, "rank")),
            rating_type,
            scraped_at: now,
        })
        .collect()
}

fn split_rows(data: &Value, player_id: i64, now: DateTime<Utc>) -> Vec<PlayerSplit> {
    let mut rows = Vec::new();
    for (key, split_type) in SplitType::BLOCKS {
        for row in nba_body(data, key) {
            rows.push(PlayerSplit {
                player_id,
                split_type,
                // The category rides in the season column ("October",
                // "0 Days Rest", a team code, ...).
                split_category: text_of(row, "season"),
                line: SeasonAverages::from_row(row),
                scraped_at: now,
            });
        }
    }
    rows
}

/// Rows live under `<block>.nba.body`; anything missing yields an empty slice.
fn nba_body<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(|v| v.get("nba"))
        .and_then(|v| v.get("body"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn field<'a>(row: &'a Value, key: &str) -> &'a Value {
    row.get(key).unwrap_or(&Value::Null)
}

fn text_of(row: &Value, key: &str) -> String {
    row.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn team_of(row: &Value) -> String {
    text_of(row, "team")
}

/// Season labels arrive HTML-escaped ("2023&ndash;24").
fn season_of(row: &Value) -> String {
    text_of(row, "season").replace("&ndash;", "-")
}

/// Ages parse only when the raw value is an unsigned digit string.
fn digit_age(raw: Option<&Value>) -> Option<i64> {
    match raw {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

fn truthy(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}
