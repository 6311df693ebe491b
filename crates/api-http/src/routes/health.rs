//! Liveness probe.

use axum::routing::get;
use axum::{Json, Router};

use crate::state::ApiState;
use crate::types::PingResponse;

pub fn router() -> Router<ApiState> {
    Router::new().route("/ping", get(ping))
}

/// GET /ping
async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        message: "pong".to_string(),
    })
}
