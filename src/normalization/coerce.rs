use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Placeholder strings upstream emits where a stat has no value.
const NO_VALUE: [&str; 3] = ["", "-", "DNP"];

static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();

fn digit_run() -> &'static Regex {
    DIGIT_RUN.get_or_init(|| Regex::new(r"\d+").expect("digit run pattern"))
}

/// Coerce an upstream scalar to an integer, treating placeholders as absent.
///
/// Thousands separators and percent signs are stripped before parsing;
/// fractional strings truncate toward zero ("12.7" becomes 12). Empty,
/// zero-valued, or unparseable input comes back as `None`, never an error.
pub fn to_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => {
            let f = n.as_f64()?;
            if f == 0.0 {
                None
            } else {
                Some(f as i64)
            }
        }
        Value::Bool(b) => b.then_some(1),
        Value::String(s) => {
            if NO_VALUE.contains(&s.as_str()) {
                return None;
            }
            let cleaned = s.replace(',', "").replace('%', "");
            cleaned.trim().parse::<f64>().ok().map(|f| f as i64)
        }
        _ => None,
    }
}

/// Coerce an upstream scalar to a float under the same placeholder rules
/// as [`to_int`].
pub fn to_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64().filter(|f| *f != 0.0),
        Value::Bool(b) => b.then_some(1.0),
        Value::String(s) => {
            if NO_VALUE.contains(&s.as_str()) {
                return None;
            }
            let cleaned = s.replace(',', "").replace('%', "");
            cleaned.trim().parse::<f64>().ok()
        }
        _ => None,
    }
}

/// HTML-tolerant integer extraction that never fails.
///
/// Strings carrying markup (anything containing `<`) yield their first run
/// of digits; placeholders and unparseable input yield 0.
pub fn extract_numeric(raw: &Value) -> i64 {
    match raw {
        Value::Number(n) => n.as_f64().map(|f| f as i64).unwrap_or(0),
        Value::Bool(b) => *b as i64,
        Value::String(s) => {
            if NO_VALUE.contains(&s.as_str()) {
                return 0;
            }
            if s.contains('<') {
                return digit_run()
                    .find(s)
                    .and_then(|m| m.as_str().parse::<i64>().ok())
                    .unwrap_or(0);
            }
            s.trim().parse::<i64>().unwrap_or(0)
        }
        _ => 0,
    }
}
