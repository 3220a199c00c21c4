// NBA league endpoints: the stats game finder and the live box score CDN.
// Payloads are cached raw; normalization happens on read.

pub mod provider;

pub use provider::{is_valid_game_id, NbaProvider};
