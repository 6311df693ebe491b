//! HTTP Request/Response Types

use resona_core::domain::JobState;
use serde::{Deserialize, Serialize};

/// POST /generate - response body (202)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub message: String,
    pub task_id: String,
}

/// GET /status/{task_id} - response body (200)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub task_id: String,
    pub status: JobState,
}

/// GET /ping - response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
}
