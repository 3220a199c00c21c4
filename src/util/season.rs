use chrono::{Datelike, Utc};

/// The season in progress, in the dashed form upstreams use ("2025-26").
/// Seasons roll over in October; before that the running season started the
/// previous calendar year.
pub fn current_season() -> String {
    let now = Utc::now();
    season_for(now.year(), now.month())
}

pub(crate) fn season_for(year: i32, month: u32) -> String {
    let start = if month >= 10 { year } else { year - 1 };
    format!("{}-{:02}", start, (start + 1) % 100)
}

/// Start year of a dashed season ("2025-26" maps to 2025). Falls back to the
/// current season's start year for unparseable input.
pub fn season_start_year(season: &str) -> i64 {
    season
        .get(..4)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            let now = Utc::now();
            let start = if now.month() >= 10 {
                now.year()
            } else {
                now.year() - 1
            };
            start as i64
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_roll_over_in_october() {
        assert_eq!(season_for(2026, 1), "2025-26");
        assert_eq!(season_for(2025, 10), "2025-26");
        assert_eq!(season_for(2025, 6), "2024-25");
    }

    #[test]
    fn century_wrap_formats_two_digits() {
        assert_eq!(season_for(1999, 11), "1999-00");
    }

    #[test]
    fn start_year_comes_from_the_dashed_form() {
        assert_eq!(season_start_year("2025-26"), 2025);
        assert_eq!(season_start_year("2019-20"), 2019);
    }
}
