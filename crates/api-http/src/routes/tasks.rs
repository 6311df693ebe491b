//! Handlers for the generation task endpoints.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use resona_core::application::registry::QueueSnapshot;
use resona_core::application::{submit, SubmitRequest};
use resona_core::domain::JobState;
use resona_core::port::LogLevel;

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;
use crate::types::{GenerateResponse, StatusResponse};

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/status/{task_id}", get(status))
        .route("/download/{task_id}", get(download))
        .route("/queue", get(queue))
}

/// POST /generate
///
/// Always 202 when well-formed; never blocks on generation. 409 when the id
/// already has a non-terminal job (resubmission is rejected mid-flight).
async fn generate(
    State(state): State<ApiState>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    let task_id = submit::execute(&state.registry, &state.submissions, req)?;
    state.log_sink.log(
        LogLevel::Info,
        &format!("Accepted audio generation task {task_id}"),
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            message: "Task accepted".to_string(),
            task_id,
        }),
    ))
}

/// GET /status/{task_id}
async fn status(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let job = state
        .registry
        .get(&task_id)
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    Ok(Json(StatusResponse {
        task_id,
        status: job.state,
    }))
}

/// GET /download/{task_id}
///
/// Serves the artifact while the job is Done and the file has not been
/// reaped yet. Anything else is a 404.
async fn download(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let job = state
        .registry
        .get(&task_id)
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let artifact = match (job.state, job.result_path) {
        (JobState::Done, Some(path)) => path,
        _ => return Err(ApiError::NotFound("Result not available".to_string())),
    };

    let bytes = tokio::fs::read(&artifact)
        .await
        .map_err(|_| ApiError::NotFound("Result no longer available".to_string()))?;

    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{task_id}.wav"));

    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    ))
}

/// GET /queue
///
/// Snapshot of the registry partitioned by state; computed under a single
/// lock so the counts always sum to `total`.
async fn queue(State(state): State<ApiState>) -> Json<QueueSnapshot> {
    Json(state.registry.snapshot())
}
