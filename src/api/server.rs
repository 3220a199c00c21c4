// API server assembly using actix-web.

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

use crate::api::handlers::AppState;
use crate::api::{middleware, routes};
use crate::util::env::env_opt;

pub struct ApiServer {
    pub addr: String,
    pub allowed_origins: String,
}

impl ApiServer {
    /// Env: API_ADDR (default 0.0.0.0:8080), CORS_ALLOWED_ORIGINS
    /// (comma-separated; empty or "*" is fully permissive).
    pub fn from_env() -> Self {
        crate::util::env::init_env();
        Self {
            addr: env_opt("API_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            allowed_origins: env_opt("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
        }
    }

    /// Serve until the process winds down. Blocks the calling task.
    pub async fn run(self, state: AppState) -> Result<()> {
        tracing::info!(addr = %self.addr, "starting api server");

        let state = web::Data::new(state);
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(state.clone())
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .configure(routes::configure_routes)
        })
        .bind(&self.addr)
        .with_context(|| format!("failed to bind {}", self.addr))?
        .run()
        .await
        .context("http server error")?;

        Ok(())
    }
}
