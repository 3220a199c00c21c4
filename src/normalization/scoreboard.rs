use anyhow::{bail, Result};
use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;

/// One completed game assembled from the two team rows the league game
/// finder returns per contest.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreboardGame {
    pub game_id: String,
    pub game_date: String,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_team_score: Option<i64>,
    pub away_team_score: Option<i64>,
    pub matchup: String,
}

struct TeamRow {
    game_id: String,
    game_date: String,
    team_id: i64,
    points: Option<i64>,
    matchup: String,
    season_id: String,
}

/// Pair the tabular league-game-finder payload into one row per game.
///
/// The finder lists each game twice, once per team: the home side's
/// matchup reads `"ATL vs. BOS"`, the road side's `"BOS @ ATL"`. Home rows
/// are filtered to the requested season, deduplicated by game id in payload
/// order, then joined with the road row carrying the opposing score. Games
/// missing their road row are dropped.
pub fn pair_scoreboard_games(payload: &Value, season: &str) -> Result<Vec<ScoreboardGame>> {
    let Some(result_set) = payload
        .get("resultSets")
        .and_then(Value::as_array)
        .and_then(|s| s.first())
    else {
        bail!("league game finder payload has no result sets");
    };

    let headers: Vec<&str> = result_set
        .get("headers")
        .and_then(Value::as_array)
        .map(|h| h.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let column = |name: &str| headers.iter().position(|h| *h == name);
    let (Some(game_id_col), Some(game_date_col), Some(team_id_col), Some(pts_col), Some(matchup_col), Some(season_id_col)) = (
        column("GAME_ID"),
        column("GAME_DATE"),
        column("TEAM_ID"),
        column("PTS"),
        column("MATCHUP"),
        column("SEASON_ID"),
    ) else {
        bail!("league game finder response is missing expected columns");
    };

    let rows: Vec<TeamRow> = result_set
        .get("rowSet")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let cells = row.as_array()?;
                    Some(TeamRow {
                        game_id: cell_text(cells, game_id_col),
                        game_date: cell_text(cells, game_date_col),
                        team_id: cells.get(team_id_col).and_then(Value::as_i64).unwrap_or(0),
                        points: cells.get(pts_col).and_then(Value::as_i64),
                        matchup: cell_text(cells, matchup_col),
                        season_id: cell_text(cells, season_id_col),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    // Road rows join by game id regardless of season; the home side's
    // season filter already scopes the output.
    let road_rows = rows
        .iter()
        .filter(|r| r.matchup.contains(" @ "))
        .map(|r| (r.game_id.as_str(), r))
        .into_group_map();

    let wanted_season = season_id_for(season);
    let mut seen = std::collections::HashSet::new();
    let mut games = Vec::new();
    for row in &rows {
        if !row.matchup.contains(" vs. ") || row.season_id != wanted_season {
            continue;
        }
        if !seen.insert(row.game_id.as_str()) {
            continue;
        }
        let Some(road) = road_rows
            .get(row.game_id.as_str())
            .and_then(|candidates| candidates.iter().find(|r| r.team_id != row.team_id))
        else {
            continue;
        };
        games.push(ScoreboardGame {
            game_id: row.game_id.clone(),
            game_date: date_part(&row.game_date),
            home_team_id: row.team_id,
            away_team_id: road.team_id,
            home_team_score: row.points,
            away_team_score: road.points,
            matchup: row.matchup.clone(),
        });
    }
    Ok(games)
}

/// Season id the finder uses for regular-season rows: a `2` prefix plus the
/// starting year ("2025-26" maps to "22025").
fn season_id_for(season: &str) -> String {
    format!("2{}", season.get(..4).unwrap_or(season))
}

fn cell_text(cells: &[Value], idx: usize) -> String {
    cells
        .get(idx)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Timestamps arrive as "2026-01-14T00:00:00"; only the date part matters.
fn date_part(raw: &str) -> String {
    raw.split('T').next().unwrap_or(raw).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finder_payload() -> Value {
        json!({
            "resultSets": [{
                "headers": ["SEASON_ID", "TEAM_ID", "GAME_ID", "GAME_DATE", "MATCHUP", "PTS"],
                "rowSet": [
                    ["22025", 1610612737, "0022500311", "2026-01-14T00:00:00", "ATL vs. BOS", 118],
                    ["22025", 1610612738, "0022500311", "2026-01-14T00:00:00", "BOS @ ATL", 112],
                    ["22025", 1610612744, "0022500312", "2026-01-14T00:00:00", "GSW vs. LAL", 104],
                    ["22025", 1610612747, "0022500312", "2026-01-14T00:00:00", "LAL @ GSW", 99],
                    // Preseason row that must not leak into the pairing.
                    ["12025", 1610612737, "0012500007", "2025-10-08T00:00:00", "ATL vs. MIA", 96],
                    // Home row without a matching road row.
                    ["22025", 1610612749, "0022500399", "2026-01-15T00:00:00", "MIL vs. CHI", 120]
                ]
            }]
        })
    }

    #[test]
    fn pairs_home_and_road_rows() {
        let games = pair_scoreboard_games(&finder_payload(), "2025-26").unwrap();
        assert_eq!(games.len(), 2);

        let first = &games[0];
        assert_eq!(first.game_id, "0022500311");
        assert_eq!(first.game_date, "2026-01-14");
        assert_eq!(first.home_team_id, 1610612737);
        assert_eq!(first.away_team_id, 1610612738);
        assert_eq!(first.home_team_score, Some(118));
        assert_eq!(first.away_team_score, Some(112));
        assert_eq!(first.matchup, "ATL vs. BOS");
    }

    #[test]
    fn filters_out_other_seasons_and_unpaired_games() {
        let games = pair_scoreboard_games(&finder_payload(), "2025-26").unwrap();
        assert!(games.iter().all(|g| g.game_id.starts_with("00225")));
        assert!(!games.iter().any(|g| g.game_id == "0022500399"));
    }

    #[test]
    fn duplicate_home_rows_keep_first_occurrence() {
        let mut payload = finder_payload();
        let rows = payload["resultSets"][0]["rowSet"].as_array_mut().unwrap();
        rows.push(json!([
            "22025", 1610612737, "0022500311", "2026-01-14T00:00:00", "ATL vs. BOS", 999
        ]));
        let games = pair_scoreboard_games(&payload, "2025-26").unwrap();
        let game = games.iter().find(|g| g.game_id == "0022500311").unwrap();
        assert_eq!(game.home_team_score, Some(118));
    }

    #[test]
    fn season_id_derivation_uses_start_year() {
        assert_eq!(season_id_for("2025-26"), "22025");
        assert_eq!(season_id_for("2019-20"), "22019");
    }

    #[test]
    fn missing_columns_are_an_error() {
        let payload = json!({
            "resultSets": [{"headers": ["GAME_ID"], "rowSet": []}]
        });
        assert!(pair_scoreboard_games(&payload, "2025-26").is_err());
    }
}
