// Request and response envelopes shared by every endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard response wrapper. Every endpoint returns one of these, success
/// or not, so clients can always read the same shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in all responses. The request id ties a client report
/// back to the server logs.
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct GamesQuery {
    pub limit: Option<i64>,
}

/// Cache-backed endpoints take refresh=1 to force a re-fetch.
#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    pub refresh: Option<u8>,
}

impl RefreshQuery {
    pub fn force(&self) -> bool {
        self.refresh == Some(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct ScoreboardQuery {
    pub season: Option<String>,
    pub refresh: Option<u8>,
}

impl ScoreboardQuery {
    pub fn force(&self) -> bool {
        self.refresh == Some(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct StandingsQuery {
    pub season: Option<i64>,
    pub refresh: Option<u8>,
}

impl StandingsQuery {
    pub fn force(&self) -> bool {
        self.refresh == Some(1)
    }
}
