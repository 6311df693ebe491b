// Worker Dispatcher - drains the submission queue against the exclusive
// generation resource

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::registry::TaskRegistry;
use crate::application::submit::{Submission, SubmissionReceiver};
use crate::port::{LogLevel, LogSink, Persister, Synthesizer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Dispatcher tuning knobs
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Number of execution slots. Generation is never invoked with more
    /// concurrency than this; excess work queues.
    pub pool_size: usize,
    /// Optional fixed pause between consecutive dispatches on a slot
    /// (throttle for the shared resource; zero disables it).
    pub dispatch_delay: Duration,
    /// Deadline around one synthesize call; zero disables the deadline.
    pub synthesis_timeout: Duration,
    /// Directory receiving `<id>.wav` artifacts.
    pub output_dir: PathBuf,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            dispatch_delay: DEFAULT_DISPATCH_DELAY,
            synthesis_timeout: DEFAULT_SYNTHESIS_TIMEOUT,
            output_dir: PathBuf::from("./output"),
        }
    }
}

/// Worker Dispatcher
///
/// A fixed pool of slots shares the single submission receiver; each slot
/// dequeues, transitions the job through the registry, runs the synthesizer
/// under a deadline, and forwards successful artifacts to the persister.
/// Per-job failures are recorded on that job and never break the loop.
pub struct Dispatcher {
    registry: Arc<TaskRegistry>,
    synthesizer: Arc<dyn Synthesizer>,
    persister: Arc<dyn Persister>,
    log_sink: Arc<dyn LogSink>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<TaskRegistry>,
        synthesizer: Arc<dyn Synthesizer>,
        persister: Arc<dyn Persister>,
        log_sink: Arc<dyn LogSink>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            synthesizer,
            persister,
            log_sink,
            config,
        }
    }

    /// Spawn the dispatch pool. Returns one JoinHandle per slot so the
    /// composition root can drain them on shutdown.
    pub fn spawn(
        self,
        receiver: SubmissionReceiver,
        shutdown: ShutdownToken,
    ) -> Vec<JoinHandle<()>> {
        let pool_size = self.config.pool_size.max(1);
        let this = Arc::new(self);
        let receiver = Arc::new(Mutex::new(receiver));

        (0..pool_size)
            .map(|slot| {
                let this = Arc::clone(&this);
                let receiver = Arc::clone(&receiver);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    this.run_slot(slot, receiver, shutdown).await;
                })
            })
            .collect()
    }

    async fn run_slot(
        &self,
        slot: usize,
        receiver: Arc<Mutex<SubmissionReceiver>>,
        mut shutdown: ShutdownToken,
    ) {
        info!(slot, "Dispatch slot started");
        loop {
            // Hold the receiver lock only while waiting for the next item so
            // other slots can take over the moment we start processing.
            let next = {
                let mut rx = receiver.lock().await;
                tokio::select! {
                    item = rx.recv() => item,
                    _ = shutdown.wait() => {
                        info!(slot, "Dispatch slot shutting down");
                        return;
                    }
                }
            };

            let Some(submission) = next else {
                info!(slot, "Submission queue closed, dispatch slot stopping");
                return;
            };

            self.process(submission).await;

            if !self.config.dispatch_delay.is_zero() {
                tokio::select! {
                    _ = sleep(self.config.dispatch_delay) => {}
                    _ = shutdown.wait() => {
                        info!(slot, "Dispatch slot shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// Process a single submission end to end.
    ///
    /// Public so tests can drive one dispatch without the pool machinery.
    pub async fn process(&self, submission: Submission) {
        let task_id = submission.id;

        if let Err(e) = self.registry.set_processing(&task_id) {
            // Duplicate dequeue or vanished record; skip rather than crash
            // the loop. The registry transition guard keeps at most one slot
            // holding an id in Processing.
            warn!(task_id = %task_id, error = %e, "Skipping submission");
            return;
        }

        info!(task_id = %task_id, "Processing generation task");
        let out_path = self.config.output_dir.join(format!("{}.wav", task_id));

        match self.run_synthesis(&submission.prompt, &out_path).await {
            Ok(()) => {
                if let Err(e) = self.registry.set_done(&task_id, out_path.clone()) {
                    error!(task_id = %task_id, error = %e, "Failed to record completion");
                    return;
                }
                info!(task_id = %task_id, path = %out_path.display(), "Generation completed");
                self.log_sink.log(
                    LogLevel::Info,
                    &format!("Completed audio generation for task {}", task_id),
                );

                // Best-effort: a persister failure is logged but the job
                // stays Done - the artifact remains locally retrievable
                // until the reaper's TTL.
                if let Err(e) = self.persister.store(&task_id, &out_path).await {
                    warn!(task_id = %task_id, error = %e, "Failed to persist artifact");
                    self.log_sink.log(
                        LogLevel::Error,
                        &format!("Failed to persist artifact for task {}: {}", task_id, e),
                    );
                }
            }
            Err(message) => {
                error!(task_id = %task_id, error = %message, "Generation failed");
                self.log_sink.log(
                    LogLevel::Error,
                    &format!("Audio generation failed for task {}: {}", task_id, message),
                );
                if let Err(e) = self.registry.set_error(&task_id, &message) {
                    error!(task_id = %task_id, error = %e, "Failed to record error");
                }
                // A failed or aborted runner may have written a partial
                // artifact; the Error job carries no result_path, so the
                // reaper would never reclaim it.
                match tokio::fs::remove_file(&out_path).await {
                    Ok(()) => {
                        debug!(task_id = %task_id, path = %out_path.display(), "Removed partial artifact");
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(task_id = %task_id, path = %out_path.display(), error = %e, "Failed to remove partial artifact");
                    }
                }
            }
        }
    }

    /// Run one synthesize call isolated in its own task, under the deadline.
    ///
    /// Spawning isolates panics: a panicking synthesizer fails its job, not
    /// the dispatch slot. On deadline expiry the task is aborted, which
    /// kills a subprocess-backed runner via kill_on_drop.
    async fn run_synthesis(&self, prompt: &str, out_path: &PathBuf) -> Result<(), String> {
        let synthesizer = Arc::clone(&self.synthesizer);
        let prompt = prompt.to_string();
        let path = out_path.clone();

        let mut handle = tokio::spawn(async move { synthesizer.synthesize(&prompt, &path).await });

        let joined = if self.config.synthesis_timeout.is_zero() {
            (&mut handle).await
        } else {
            tokio::select! {
                res = &mut handle => res,
                _ = sleep(self.config.synthesis_timeout) => {
                    handle.abort();
                    return Err(format!(
                        "generation timed out after {}s",
                        self.config.synthesis_timeout.as_secs()
                    ));
                }
            }
        };

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join_err) if join_err.is_panic() => Err("synthesis panicked".to_string()),
            Err(_) => Err("synthesis task cancelled".to_string()),
        }
    }
}
