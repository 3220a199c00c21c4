use super::boxscore::PlayerGameStat;

/// Box-score inputs to the rating formula.
///
/// Missed-shot counts are derived from made/attempted pairs at scoring
/// time, clamped at zero so inconsistent upstream splits cannot push a
/// log term out of domain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingLine {
    pub points: i64,
    pub assists: i64,
    pub offensive_rebounds: i64,
    pub defensive_rebounds: i64,
    pub steals: i64,
    pub blocks: i64,
    pub turnovers: i64,
    pub personal_fouls: i64,
    pub fg_made: i64,
    pub fg_attempted: i64,
    pub three_pt_made: i64,
    pub ft_made: i64,
    pub ft_attempted: i64,
    pub ejections: i64,
}

impl From<&PlayerGameStat> for RatingLine {
    fn from(stat: &PlayerGameStat) -> Self {
        let (fg_made, fg_attempted) = stat
            .field_goals
            .map(|l| (l.made, l.attempted))
            .unwrap_or((0, 0));
        Self {
            points: stat.points,
            assists: stat.assists,
            offensive_rebounds: stat.offensive_rebounds,
            defensive_rebounds: stat.defensive_rebounds,
            steals: stat.steals,
            blocks: stat.blocks,
            turnovers: stat.turnovers,
            personal_fouls: stat.personal_fouls,
            fg_made,
            fg_attempted,
            three_pt_made: stat.three_pointers.map(|l| l.made).unwrap_or(0),
            ft_made: stat.free_throws.map(|l| l.made).unwrap_or(0),
            ft_attempted: stat.free_throws.map(|l| l.attempted).unwrap_or(0),
            ejections: stat.ejected,
        }
    }
}

/// Score a box-score line on the fixed 0-10 scale.
///
/// The weights are a fixed, hand-tuned scoring model. Do not retune them:
/// stored ratings and downstream consumers depend on the exact values.
/// Deterministic, pure, rounded to two decimals.
pub fn rate(line: &RatingLine) -> f64 {
    let mut score = 0.0;

    score += contribution(line.points, 0.17, 0.02);
    score += contribution(line.assists, 0.33, 0.06);
    score += contribution(line.offensive_rebounds, 0.17, 0.02);
    score += contribution(line.defensive_rebounds, 0.13, 0.01);
    score += contribution(line.steals, 0.37, 0.06);
    score += contribution(line.blocks, 0.34, 0.05);

    score -= contribution(line.turnovers, 0.45, 0.03);
    score -= foul_cost(line.personal_fouls);

    score += contribution(line.fg_made, 0.11, 0.02);
    score -= contribution((line.fg_attempted - line.fg_made).max(0), 0.12, 0.03);
    score += contribution(line.three_pt_made, 0.11, 0.03);
    score += 0.01 * ln1p(line.ft_attempted);
    score += contribution(line.ft_made, 0.04, 0.005);
    score -= contribution((line.ft_attempted - line.ft_made).max(0), 0.07, 0.02);

    score -= 2.5 * ln1p(line.ejections);

    score += double_double_bonus(
        line.points,
        line.assists,
        line.offensive_rebounds + line.defensive_rebounds,
    );

    round2(score.clamp(0.0, 10.0))
}

fn contribution(value: i64, log_weight: f64, linear_weight: f64) -> f64 {
    log_weight * ln1p(value) + linear_weight * value as f64
}

fn ln1p(value: i64) -> f64 {
    (value as f64 + 1.0).ln()
}

/// Fouling out costs a flat 2 points; below that the cost scales like the
/// other categories.
fn foul_cost(fouls: i64) -> f64 {
    if fouls > 5 {
        2.0
    } else {
        contribution(fouls, 0.3, 0.05)
    }
}

/// Mutually exclusive bonus, first match wins. Thresholds are strictly
/// greater than 10, so an exact 10/10 double-double earns nothing.
fn double_double_bonus(points: i64, assists: i64, rebounds: i64) -> f64 {
    if points > 10 && assists > 10 && rebounds > 10 {
        1.24
    } else if points > 10 && rebounds > 10 {
        0.38
    } else if points > 10 && assists > 10 {
        0.44
    } else {
        0.0
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
