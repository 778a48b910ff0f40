//! Health check endpoint.
//!
//! Returns 200 OK if both PostgreSQL and Redis are reachable,
//! 503 Service Unavailable otherwise.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    postgres: bool,
    redis: bool,
}

impl HealthResponse {
    fn new(postgres: bool, redis: bool) -> (StatusCode, Self) {
        let healthy = postgres && redis;
        let (code, status) = if healthy {
            (StatusCode::OK, "healthy")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        };

        (
            code,
            Self {
                status,
                postgres,
                redis,
            },
        )
    }
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (postgres, redis) = tokio::join!(state.postgres_healthy(), state.redis_healthy());
    let (code, body) = HealthResponse::new(postgres, redis);

    if code != StatusCode::OK {
        tracing::warn!(postgres, redis, "health check failed");
    }

    (code, Json(body))
}

/// Create the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
