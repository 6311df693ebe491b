// Submission Use Case
//
// Admission path: validate, create the Pending record, then enqueue. The
// ordering matters - a status probe issued right after the 202 must find the
// job, so the registry write happens before the channel send.

use crate::application::registry::TaskRegistry;
use crate::domain::{DomainError, TaskId};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One pending work item flowing from the request surface to the dispatcher
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: TaskId,
    pub prompt: String,
}

pub type SubmissionSender = mpsc::UnboundedSender<Submission>;
pub type SubmissionReceiver = mpsc::UnboundedReceiver<Submission>;

/// Create the FIFO submission channel.
///
/// Unbounded: acceptance is O(1) relative to generation latency and the
/// request handler never blocks behind a slow worker.
pub fn submission_channel() -> (SubmissionSender, SubmissionReceiver) {
    mpsc::unbounded_channel()
}

/// Submit request (the POST /generate body)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub user_id: String,
    pub prompt: String,
}

const MAX_ID_LEN: usize = 64;
const MAX_PROMPT_LEN: usize = 2000;

/// Validate a submission before any job is created.
///
/// The id names the artifact file on disk, so it is restricted to a safe
/// character set.
pub fn validate_request(req: &SubmitRequest) -> Result<()> {
    if req.user_id.is_empty() {
        return Err(AppError::Validation("user_id must not be empty".to_string()));
    }
    if req.user_id.len() > MAX_ID_LEN {
        return Err(AppError::Validation(format!(
            "user_id too long (max {} chars)",
            MAX_ID_LEN
        )));
    }
    if !req
        .user_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(
            "user_id must be alphanumeric with '-' or '_'".to_string(),
        ));
    }
    if req.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt must not be empty".to_string()));
    }
    if req.prompt.len() > MAX_PROMPT_LEN {
        return Err(AppError::Validation(format!(
            "prompt too long (max {} chars)",
            MAX_PROMPT_LEN
        )));
    }
    Ok(())
}

/// Execute the submission use case
///
/// # Errors
/// - `AppError::Validation` for malformed requests (no job is created)
/// - `AppError::Conflict` when the id already has a non-terminal job
pub fn execute(
    registry: &TaskRegistry,
    queue: &SubmissionSender,
    req: SubmitRequest,
) -> Result<TaskId> {
    validate_request(&req)?;

    let id = req.user_id;
    match registry.create(id.clone(), req.prompt.clone()) {
        Ok(()) => {}
        Err(DomainError::TaskStillActive(id)) => {
            return Err(AppError::Conflict(format!(
                "task {} is still being processed",
                id
            )));
        }
        Err(e) => return Err(e.into()),
    }

    let submission = Submission {
        id: id.clone(),
        prompt: req.prompt,
    };
    if queue.send(submission).is_err() {
        // Dispatcher is gone (shutdown). Do not strand the record in Pending;
        // the reaper will reclaim the Error entry after TTL.
        let _ = registry.set_error(&id, "submission queue closed");
        return Err(AppError::Internal(
            "submission queue is closed".to_string(),
        ));
    }

    tracing::info!(task_id = %id, "Accepted generation task");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobState;
    use crate::port::time_provider::mocks::FixedTimeProvider;
    use std::sync::Arc;

    fn request(id: &str, prompt: &str) -> SubmitRequest {
        SubmitRequest {
            user_id: id.to_string(),
            prompt: prompt.to_string(),
        }
    }

    #[test]
    fn rejects_empty_user_id() {
        let err = validate_request(&request("", "p")).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn rejects_long_user_id() {
        let id = "a".repeat(65);
        let err = validate_request(&request(&id, "p")).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn rejects_path_hostile_user_id() {
        for bad in ["../etc", "a/b", "a b", "a.wav"] {
            assert!(validate_request(&request(bad, "p")).is_err(), "{}", bad);
        }
    }

    #[test]
    fn rejects_blank_prompt() {
        let err = validate_request(&request("u1", "   ")).unwrap_err();
        assert!(err.to_string().contains("prompt"));
    }

    #[test]
    fn accepts_reasonable_request() {
        assert!(validate_request(&request("user-42_a", "banana chips")).is_ok());
    }

    #[tokio::test]
    async fn execute_creates_before_enqueue() {
        let registry = TaskRegistry::new(Arc::new(FixedTimeProvider::new(0)));
        let (tx, mut rx) = submission_channel();

        let id = execute(&registry, &tx, request("u1", "banana chips")).unwrap();
        assert_eq!(id, "u1");

        // Job is visible as pending before any worker tick
        assert_eq!(registry.get("u1").unwrap().state, JobState::Pending);

        let item = rx.recv().await.unwrap();
        assert_eq!(item.id, "u1");
        assert_eq!(item.prompt, "banana chips");
    }

    #[tokio::test]
    async fn execute_conflicts_on_active_resubmission() {
        let registry = TaskRegistry::new(Arc::new(FixedTimeProvider::new(0)));
        let (tx, _rx) = submission_channel();

        execute(&registry, &tx, request("u1", "first")).unwrap();
        let err = execute(&registry, &tx, request("u1", "second")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(registry.get("u1").unwrap().prompt, "first");
    }

    #[tokio::test]
    async fn closed_queue_marks_job_error() {
        let registry = TaskRegistry::new(Arc::new(FixedTimeProvider::new(0)));
        let (tx, rx) = submission_channel();
        drop(rx);

        let err = execute(&registry, &tx, request("u1", "p")).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        let job = registry.get("u1").unwrap();
        assert_eq!(job.state, JobState::Error);
        assert!(job.error.as_deref().unwrap().contains("queue"));
    }
}
