// Job Domain Model

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Task ID (caller-supplied, unique within the registry at any point in time)
pub type TaskId = String;

/// Job lifecycle state
///
/// Transitions only move forward: Pending -> Processing -> {Done, Error}.
/// Done and Error are terminal; the only way out is deletion by the reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Done,
    Error,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Error)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Processing => write!(f, "processing"),
            JobState::Done => write!(f, "done"),
            JobState::Error => write!(f, "error"),
        }
    }
}

/// Job Entity - one submitted generation request and its tracked lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: TaskId,
    pub prompt: String,
    pub state: JobState,

    /// Set only in Done. The artifact file belongs to this Job until the
    /// reaper deletes both.
    pub result_path: Option<PathBuf>,
    /// Set only in Error.
    pub error: Option<String>,

    pub created_at: i64, // epoch ms
    /// Stamped on entry into Done or Error; the reaper's expiry clock anchor.
    pub completed_at: Option<i64>,
}

impl Job {
    /// Create a new Pending job
    ///
    /// # Arguments
    ///
    /// * `id` - Caller-supplied task ID (injected, not generated)
    /// * `prompt` - Free-form text input for the synthesizer
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(id: impl Into<String>, prompt: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            state: JobState::Pending,
            result_path: None,
            error: None,
            created_at,
            completed_at: None,
        }
    }

    /// Transition to Processing with explicit timestamp
    pub fn start(&mut self) -> crate::domain::error::Result<()> {
        if self.state != JobState::Pending {
            return Err(crate::domain::error::DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "processing".to_string(),
            });
        }
        self.state = JobState::Processing;
        Ok(())
    }

    /// Transition to Done with the artifact path and explicit timestamp
    pub fn complete(
        &mut self,
        result_path: PathBuf,
        now_millis: i64,
    ) -> crate::domain::error::Result<()> {
        if self.state != JobState::Processing {
            return Err(crate::domain::error::DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "done".to_string(),
            });
        }
        self.state = JobState::Done;
        self.result_path = Some(result_path);
        self.completed_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Error with a message and explicit timestamp
    ///
    /// Allowed from any non-terminal state: a job can fail before a worker
    /// picked it up (e.g. the submission queue was closed).
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        now_millis: i64,
    ) -> crate::domain::error::Result<()> {
        if self.state.is_terminal() {
            return Err(crate::domain::error::DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "error".to_string(),
            });
        }
        self.state = JobState::Error;
        self.error = Some(message.into());
        self.completed_at = Some(now_millis);
        Ok(())
    }

    /// Whether this job expired before `cutoff_millis` (terminal + old enough)
    pub fn expired_before(&self, cutoff_millis: i64) -> bool {
        match self.completed_at {
            Some(done_at) => self.state.is_terminal() && done_at < cutoff_millis,
            None => false,
        }
    }
}
