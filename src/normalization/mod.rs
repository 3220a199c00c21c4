// Normalization layer: raw upstream JSON in, typed stat rows out.
// Every fetcher hands its payload through here before persistence.

pub mod boxscore;
pub mod coerce;
pub mod player;
pub mod rating;
pub mod roster;
pub mod scoreboard;
pub mod standings;

pub use boxscore::{PlayerGameStat, TeamGameStat};
pub use rating::{rate, RatingLine};
