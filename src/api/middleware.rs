// Request logging, compression and CORS.

use actix_web::middleware::{Compress, Logger};

pub fn setup_middleware() -> (Logger, Compress) {
    let logger = Logger::default();
    let compress = Compress::default();
    (logger, compress)
}

use actix_cors::Cors;
use actix_web::http::header;

/// CORS from a comma-separated origin list. An empty list or "*" means a
/// fully permissive policy; this is a read-only API.
pub fn setup_cors(allowed_origins: &str) -> Cors {
    let trimmed = allowed_origins.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return Cors::permissive();
    }

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600);

    for origin in trimmed.split(',') {
        cors = cors.allowed_origin(origin.trim());
    }

    cors
}
