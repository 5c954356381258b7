//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// `GET /api/health`: liveness plus a database reachability check.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let database = ctx.core.open_db().is_ok();
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        version: crate::config::APP_VERSION,
        uptime_secs: ctx.core.uptime_secs(),
    })
}
