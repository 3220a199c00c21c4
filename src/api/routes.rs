// Route table. Read-only API, everything versioned under /api/v1.

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        .service(
            web::scope("/api/v1")
                .route("/games", web::get().to(handlers::list_games))
                .route(
                    "/games/{game_id}/stats",
                    web::get().to(handlers::get_game_stats),
                )
                .route(
                    "/games/{game_id}/live",
                    web::get().to(handlers::get_live_boxscore),
                )
                .route(
                    "/players/{player_id}/seasons",
                    web::get().to(handlers::get_player_seasons),
                )
                .route(
                    "/players/{player_id}/ratings",
                    web::get().to(handlers::get_player_ratings),
                )
                .route(
                    "/players/{player_id}/profile",
                    web::get().to(handlers::get_player_profile),
                )
                .route(
                    "/teams/{team_code}/roster",
                    web::get().to(handlers::get_team_roster),
                )
                .route("/standings", web::get().to(handlers::get_standings))
                .route("/scoreboard", web::get().to(handlers::get_scoreboard))
                .route("/snapshot", web::get().to(handlers::get_snapshot))
                .route("/metrics", web::get().to(handlers::get_refresh_metrics)),
        );
}
