use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use ballhub::cli::counts;
use ballhub::database_ops::backfill::backfill_ratings;
use ballhub::database_ops::db::Db;
use ballhub::database_ops::jobs::{
    JobRunner, PlayerJob, RatingBackfillJob, RosterJob, StandingsJob,
};
use ballhub::database_ops::rotowire::{
    probe_game_ids, scrape_game_range, sync_player, sync_players, sync_roster, sync_rosters,
    sync_standings, RotowireProvider, TEAM_CODES,
};
use ballhub::database_ops::standings::standings_for_season;
use ballhub::database_ops::teams::roster_player_ids;
use ballhub::tracing::{init_tracing, DEFAULT_FILTER};
use ballhub::util::env::{db_url, env_parse, init_env};
use ballhub::util::season::{current_season, season_start_year};

#[derive(Parser, Debug)]
#[command(name = "bh", version, about = "Basketball stats ingestion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Scrape box scores for a game id range, newest down to oldest
    ScrapeGames {
        /// Highest game id to try
        #[arg(long)]
        newest: i64,
        /// Lowest game id to try
        #[arg(long)]
        oldest: i64,
        /// Re-scrape games already stored with both teams
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Scrape one player's full page (seasons, logs, ratings, splits)
    ScrapePlayer {
        #[arg(long)]
        player_id: i64,
        /// Re-scrape even when the last attempt succeeded
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Sweep every player found on a stored roster
    ScrapePlayers {
        /// Re-scrape players whose last attempt succeeded
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Scrape one team's roster
    ScrapeRoster {
        /// Three-letter team code, e.g. BOS
        #[arg(long)]
        team_code: String,
        /// Re-scrape even when the last attempt succeeded
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Sweep all thirty rosters
    ScrapeRosters {
        /// Re-scrape teams whose last attempt succeeded
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Scrape the league standings and print the stored table
    ScrapeStandings {
        /// Season start year, e.g. 2025 (defaults to the season in progress)
        #[arg(long)]
        season: Option<i64>,
        /// Re-scrape even when the last attempt succeeded
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Rosters and standings concurrently, then the player sweep and the
    /// rating backfill
    ScrapeAll {
        /// Re-scrape entities whose last attempt succeeded
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Compute ratings for stored player lines that have none yet
    BackfillRatings,
    /// Report which game ids in a range have box score data, without writing
    ProbeGames {
        /// Highest game id to probe
        #[arg(long)]
        newest: i64,
        /// Lowest game id to probe
        #[arg(long)]
        oldest: i64,
    },
    /// Print row counts for every table
    Counts {
        /// How many recent games to list (0 skips the section)
        #[arg(long, default_value_t = 20)]
        recent: i64,
    },
}

async fn connect() -> Result<Db> {
    let max_conns = env_parse("DB_MAX_CONNS", 5u32);
    Db::connect(&db_url(), max_conns).await
}

#[tokio::main]
async fn main() -> Result<()> {
    init_env();
    init_tracing(DEFAULT_FILTER)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::ScrapeGames {
            newest,
            oldest,
            force,
        } => {
            if oldest > newest {
                bail!("--oldest must not exceed --newest");
            }
            let db = connect().await?;
            let provider = RotowireProvider::new();
            let summary = scrape_game_range(&db, &provider, newest, oldest, force).await?;
            info!(
                games = summary.games_scraped,
                skipped = summary.games_skipped,
                empty = summary.games_empty,
                player_rows = summary.player_rows,
                team_rows = summary.team_rows,
                "scrape-games: finished"
            );
        }
        Commands::ScrapePlayer { player_id, force } => {
            let db = connect().await?;
            let provider = RotowireProvider::new();
            let stored = sync_player(&db, &provider, player_id, force).await?;
            info!(player_id, stored, "scrape-player: finished");
        }
        Commands::ScrapePlayers { force } => {
            let db = connect().await?;
            let ids = roster_player_ids(&db).await?;
            if ids.is_empty() {
                bail!("no roster players stored; run scrape-rosters first");
            }
            let provider = RotowireProvider::new();
            let summary = sync_players(&db, &provider, &ids, force).await?;
            info!(
                synced = summary.players_synced,
                skipped = summary.players_skipped,
                failed = summary.players_failed,
                "scrape-players: finished"
            );
        }
        Commands::ScrapeRoster { team_code, force } => {
            let team_code = team_code.to_uppercase();
            if !TEAM_CODES.contains(&team_code.as_str()) {
                bail!("unknown team code {team_code}");
            }
            let db = connect().await?;
            let provider = RotowireProvider::new();
            let stored = sync_roster(&db, &provider, &team_code, force).await?;
            info!(team = %team_code, players = stored, "scrape-roster: finished");
        }
        Commands::ScrapeRosters { force } => {
            let db = connect().await?;
            let provider = RotowireProvider::new();
            let summary = sync_rosters(&db, &provider, force).await?;
            info!(
                rosters = summary.rosters_synced,
                failed = summary.rosters_failed,
                players = summary.roster_rows,
                "scrape-rosters: finished"
            );
        }
        Commands::ScrapeStandings { season, force } => {
            let db = connect().await?;
            let season = season.unwrap_or_else(|| season_start_year(&current_season()));
            let provider = RotowireProvider::new();
            let stored = sync_standings(&db, &provider, season, force).await?;
            info!(season, teams = stored, "scrape-standings: finished");

            let table = standings_for_season(&db, season).await?;
            println!("standings {season} ({} teams):", table.len());
            for r in table {
                let seed = r
                    .conference_seed
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let back = r
                    .games_back
                    .map(|g| format!("{g:.1}"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {:<4} {:<26} {:>2}-{:<2} {:.3}  {} seed {seed}, {back} GB, {}",
                    r.team_code, r.team_name, r.wins, r.losses, r.win_percentage, r.conference,
                    r.streak
                );
            }
        }
        Commands::ScrapeAll { force } => {
            let db = connect().await?;
            let season = season_start_year(&current_season());
            let runner = JobRunner::new_ref(&db);
            let stage_one = runner
                .run_all(vec![
                    Box::new(RosterJob { force }),
                    Box::new(StandingsJob { season, force }),
                ])
                .await;
            // The sweep reads whatever rosters stage one stored, so it still
            // runs when stage one reported an error.
            let stage_two = runner
                .run_sequence(vec![Box::new(PlayerJob { force }), Box::new(RatingBackfillJob)])
                .await;
            stage_one.and(stage_two)?;
            info!("scrape-all: finished");
        }
        Commands::BackfillRatings => {
            let db = connect().await?;
            let updated = backfill_ratings(&db).await?;
            info!(updated, "backfill-ratings: finished");
        }
        Commands::ProbeGames { newest, oldest } => {
            if oldest > newest {
                bail!("--oldest must not exceed --newest");
            }
            let provider = RotowireProvider::new();
            let valid = probe_game_ids(&provider, newest, oldest).await?;
            println!("game ids with data ({}):", valid.len());
            for id in valid {
                println!("  {id}");
            }
        }
        Commands::Counts { recent } => {
            let db = connect().await?;
            counts::run(&db, recent).await?;
        }
    }

    Ok(())
}
