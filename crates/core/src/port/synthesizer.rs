// Synthesizer Port
// Abstraction over the opaque, slow, resource-exclusive generation capability.
// The dispatcher never calls it with more concurrency than its pool size.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Synthesis errors
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Failed to start synthesis runner: {0}")]
    SpawnFailed(String),

    #[error("Synthesis runner failed: {0}")]
    RunnerFailed(String),

    #[error("Runner produced no artifact at {0}")]
    MissingArtifact(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Generation capability trait
///
/// Implementations:
/// - SubprocessSynthesizer: spawns the model runner as a child process
/// - mocks::MockSynthesizer: scripted behavior for tests
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Generate audio for `prompt` and write the artifact to `out_path`.
    ///
    /// Latency is unknown and may be very long; the dispatcher wraps this
    /// call in a deadline. On success the artifact must exist at `out_path`.
    async fn synthesize(&self, prompt: &str, out_path: &Path) -> Result<(), SynthesisError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock synthesizer behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Write a small placeholder artifact and succeed
        Success,
        /// Succeed after a fixed delay (for pool/concurrency tests)
        SlowSuccess(Duration),
        /// Always fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Never complete (for deadline testing)
        Hang,
    }

    /// Mock Synthesizer for testing
    ///
    /// Records every call (prompt + out path) and tracks the number of
    /// concurrently running synthesize calls so tests can assert the
    /// exclusive-resource invariant.
    pub struct MockSynthesizer {
        behavior: Mutex<MockBehavior>,
        calls: Mutex<Vec<(String, PathBuf)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockSynthesizer {
        pub fn new(behavior: MockBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior: Mutex::new(behavior),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        pub fn new_success() -> Arc<Self> {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Arc<Self> {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Prompts in call order (to verify which submission won)
        pub fn prompts(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(p, _)| p.clone())
                .collect()
        }

        /// Highest number of synthesize calls running at the same instant
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    /// Decrements the in-flight counter on drop, so aborted and panicking
    /// synthesize calls release their slot just like completed ones.
    struct InFlightGuard<'a>(&'a AtomicUsize);

    impl Drop for InFlightGuard<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Synthesizer for MockSynthesizer {
        async fn synthesize(&self, prompt: &str, out_path: &Path) -> Result<(), SynthesisError> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), out_path.to_path_buf()));

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            let _guard = InFlightGuard(&self.in_flight);

            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                MockBehavior::Success => {
                    write_placeholder(out_path).await;
                    Ok(())
                }
                MockBehavior::SlowSuccess(delay) => {
                    tokio::time::sleep(delay).await;
                    write_placeholder(out_path).await;
                    Ok(())
                }
                MockBehavior::Fail(msg) => Err(SynthesisError::RunnerFailed(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::Hang => {
                    // Effectively forever; the dispatcher deadline aborts us
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }
    }

    async fn write_placeholder(out_path: &Path) {
        // A Done job must own an artifact that exists on disk
        let _ = tokio::fs::write(out_path, b"RIFF\0\0\0\0WAVE").await;
    }
}
