// HTTP request handlers. DB-backed endpoints read the store directly;
// upstream-backed endpoints go through the resource hub and its TTLs.

use std::sync::Arc;
use std::time::Instant;

use actix_web::{web, HttpResponse, Result};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::error;

use crate::api::models::*;
use crate::cache::{Resource, ResourceHub};
use crate::database_ops::boxscores::{game_stats, recent_games};
use crate::database_ops::db::Db;
use crate::database_ops::players::{ratings_for_player, season_stats_for_player};
use crate::database_ops::rotowire::TEAM_CODES;
use crate::normalization::scoreboard::pair_scoreboard_games;
use crate::refresh::{LiveSnapshot, RefreshMetrics};
use crate::util::retry::FetchError;
use crate::util::season::{current_season, season_start_year};

/// Everything the handlers share. The snapshot and metrics handles come from
/// the refresher and keep updating underneath us.
pub struct AppState {
    pub db: Db,
    pub hub: Arc<ResourceHub>,
    pub snapshot: Arc<RwLock<LiveSnapshot>>,
    pub metrics: Arc<Mutex<RefreshMetrics>>,
    pub started_at: Instant,
}

fn not_found(message: String) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<Value>::error(message))
}

/// 404 when upstream says the entity does not exist, 502 for everything else
/// a fetch can do wrong.
fn fetch_failure(err: anyhow::Error) -> HttpResponse {
    let missing = err
        .downcast_ref::<FetchError>()
        .map(FetchError::is_not_found)
        .unwrap_or(false);
    if missing {
        not_found(err.to_string())
    } else {
        HttpResponse::BadGateway().json(ApiResponse::<Value>::error(err.to_string()))
    }
}

fn db_failure(err: anyhow::Error) -> HttpResponse {
    error!(error = %err, "query failed");
    HttpResponse::InternalServerError().json(ApiResponse::<Value>::error("internal error"))
}

pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let database = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let status = if database == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    let response = ApiResponse::success(HealthResponse {
        status: status.to_string(),
        database: database.to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    });
    Ok(HttpResponse::Ok().json(response))
}

pub async fn list_games(
    state: web::Data<AppState>,
    query: web::Query<GamesQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    match recent_games(&state.db, limit).await {
        Ok(rows) => Ok(HttpResponse::Ok().json(ApiResponse::success(rows))),
        Err(err) => Ok(db_failure(err)),
    }
}

pub async fn get_game_stats(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let game_id = path.into_inner();
    match game_stats(&state.db, game_id).await {
        Ok(stats) if stats.players.is_empty() && stats.teams.is_empty() => {
            Ok(not_found(format!("no stored stats for game {game_id}")))
        }
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiResponse::success(stats))),
        Err(err) => Ok(db_failure(err)),
    }
}

pub async fn get_live_boxscore(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<RefreshQuery>,
) -> Result<HttpResponse> {
    let resource = Resource::LiveBoxScore {
        game_id: path.into_inner(),
    };
    match state.hub.get_cached_resource(&resource, query.force()).await {
        Ok(payload) => Ok(HttpResponse::Ok().json(ApiResponse::success(payload))),
        Err(err) => Ok(fetch_failure(err)),
    }
}

pub async fn get_player_seasons(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let player_id = path.into_inner();
    match season_stats_for_player(&state.db, player_id).await {
        Ok(rows) if rows.is_empty() => {
            Ok(not_found(format!("no stored seasons for player {player_id}")))
        }
        Ok(rows) => Ok(HttpResponse::Ok().json(ApiResponse::success(rows))),
        Err(err) => Ok(db_failure(err)),
    }
}

pub async fn get_player_ratings(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let player_id = path.into_inner();
    match ratings_for_player(&state.db, player_id).await {
        Ok(rows) if rows.is_empty() => {
            Ok(not_found(format!("no stored ratings for player {player_id}")))
        }
        Ok(rows) => Ok(HttpResponse::Ok().json(ApiResponse::success(rows))),
        Err(err) => Ok(db_failure(err)),
    }
}

pub async fn get_player_profile(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<RefreshQuery>,
) -> Result<HttpResponse> {
    let resource = Resource::PlayerProfile {
        player_id: path.into_inner(),
    };
    match state.hub.get_cached_resource(&resource, query.force()).await {
        Ok(payload) => Ok(HttpResponse::Ok().json(ApiResponse::success(payload))),
        Err(err) => Ok(fetch_failure(err)),
    }
}

pub async fn get_team_roster(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<RefreshQuery>,
) -> Result<HttpResponse> {
    let team_code = path.into_inner().to_uppercase();
    if !TEAM_CODES.contains(&team_code.as_str()) {
        return Ok(not_found(format!("unknown team code {team_code}")));
    }
    let resource = Resource::Roster { team_code };
    match state.hub.get_cached_resource(&resource, query.force()).await {
        Ok(payload) => Ok(HttpResponse::Ok().json(ApiResponse::success(payload))),
        Err(err) => Ok(fetch_failure(err)),
    }
}

pub async fn get_standings(
    state: web::Data<AppState>,
    query: web::Query<StandingsQuery>,
) -> Result<HttpResponse> {
    let season = query
        .season
        .unwrap_or_else(|| season_start_year(&current_season()));
    let resource = Resource::Standings { season };
    match state.hub.get_cached_resource(&resource, query.force()).await {
        Ok(payload) => Ok(HttpResponse::Ok().json(ApiResponse::success(payload))),
        Err(err) => Ok(fetch_failure(err)),
    }
}

pub async fn get_scoreboard(
    state: web::Data<AppState>,
    query: web::Query<ScoreboardQuery>,
) -> Result<HttpResponse> {
    let season = query.season.clone().unwrap_or_else(current_season);
    let resource = Resource::Scoreboard {
        season: season.clone(),
    };
    match state.hub.get_cached_resource(&resource, query.force()).await {
        Ok(payload) => match pair_scoreboard_games(&payload, &season) {
            Ok(games) => Ok(HttpResponse::Ok().json(ApiResponse::success(games))),
            Err(err) => {
                error!(error = %err, season = %season, "scoreboard payload did not pair");
                Ok(HttpResponse::BadGateway()
                    .json(ApiResponse::<Value>::error(err.to_string())))
            }
        },
        Err(err) => Ok(fetch_failure(err)),
    }
}

pub async fn get_snapshot(state: web::Data<AppState>) -> Result<HttpResponse> {
    let snapshot = state.snapshot.read().await.clone();
    Ok(HttpResponse::Ok().json(ApiResponse::success(snapshot)))
}

pub async fn get_refresh_metrics(state: web::Data<AppState>) -> Result<HttpResponse> {
    let metrics = state.metrics.lock().await.clone();
    Ok(HttpResponse::Ok().json(ApiResponse::success(metrics)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::configure_routes;
    use crate::cache::{BlobCache, TtlConfig};
    use crate::database_ops::boxscores::upsert_game_info;
    use crate::database_ops::db::test_db;
    use actix_web::{test, App};
    use std::time::Duration;

    async fn test_state() -> (tempfile::TempDir, web::Data<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let cache =
            BlobCache::new(dir.path().to_path_buf(), Duration::from_secs(3600)).unwrap();
        let state = AppState {
            db: test_db().await,
            hub: Arc::new(ResourceHub::new(cache, TtlConfig::from_env())),
            snapshot: Arc::new(RwLock::new(LiveSnapshot::default())),
            metrics: Arc::new(Mutex::new(RefreshMetrics::default())),
            started_at: Instant::now(),
        };
        (dir, web::Data::new(state))
    }

    #[actix_web::test]
    async fn health_reports_a_connected_database() {
        let (_dir, state) = test_state().await;
        let app =
            test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: ApiResponse<HealthResponse> = test::read_body_json(resp).await;
        assert!(body.success);
        let health = body.data.unwrap();
        assert_eq!(health.database, "connected");
        assert_eq!(health.status, "healthy");
        assert!(body.meta.is_some());
    }

    #[actix_web::test]
    async fn games_list_respects_the_limit() {
        let (_dir, state) = test_state().await;
        for game_id in 2700..2710 {
            upsert_game_info(&state.db, game_id, 2).await.unwrap();
        }
        let app =
            test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/games?limit=3")
            .to_request();
        let body: ApiResponse<Vec<Value>> =
            test::read_body_json(test::call_service(&app, req).await).await;
        let rows = body.data.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["game_id"], 2709);
    }

    #[actix_web::test]
    async fn missing_game_stats_are_a_404() {
        let (_dir, state) = test_state().await;
        let app =
            test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/games/9999/stats")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);

        let body: ApiResponse<Value> = test::read_body_json(resp).await;
        assert!(!body.success);
        assert!(body.error.unwrap().contains("9999"));
    }

    // The roster endpoint rejects garbage codes before any upstream call;
    // a fast 404 here proves the gate sits in front of the fetch.
    #[actix_web::test]
    async fn unknown_team_code_is_rejected_up_front() {
        let (_dir, state) = test_state().await;
        let app =
            test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/teams/ZZZ/roster")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn snapshot_endpoint_serves_the_live_handle() {
        let (_dir, state) = test_state().await;
        {
            let mut snap = state.snapshot.write().await;
            snap.count = 3;
            snap.error = Some("standings lagged".to_string());
        }
        let app =
            test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/snapshot").to_request();
        let body: ApiResponse<Value> =
            test::read_body_json(test::call_service(&app, req).await).await;
        let snapshot = body.data.unwrap();
        assert_eq!(snapshot["count"], 3);
        assert_eq!(snapshot["error"], "standings lagged");
    }
}
