// Persister Port
// Best-effort forwarder of a completed artifact to external long-term storage.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Persister errors
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to read artifact: {0}")]
    IoError(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Persister rejected upload with status {0}")]
    Rejected(u16),
}

/// Persistence Bridge trait
///
/// Invoked exactly once per successful generation, after the job reaches
/// Done. Failure is best-effort: the caller logs it and the job stays Done.
/// The local artifact is retained until the reaper's TTL; implementations
/// must not delete it.
#[async_trait]
pub trait Persister: Send + Sync {
    async fn store(&self, task_id: &str, artifact: &Path) -> Result<(), PersistError>;
}

/// No-op persister (debug mode skips persistence)
pub struct NoopPersister;

#[async_trait]
impl Persister for NoopPersister {
    async fn store(&self, task_id: &str, _artifact: &Path) -> Result<(), PersistError> {
        tracing::debug!(task_id = %task_id, "Persistence skipped (debug mode)");
        Ok(())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Recording persister for tests; optionally fails every call
    pub struct RecordingPersister {
        calls: Mutex<Vec<(String, PathBuf)>>,
        fail: bool,
    }

    impl RecordingPersister {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        pub fn new_failing() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        pub fn calls(&self) -> Vec<(String, PathBuf)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Persister for RecordingPersister {
        async fn store(&self, task_id: &str, artifact: &Path) -> Result<(), PersistError> {
            self.calls
                .lock()
                .unwrap()
                .push((task_id.to_string(), artifact.to_path_buf()));
            if self.fail {
                Err(PersistError::Rejected(500))
            } else {
                Ok(())
            }
        }
    }
}
