// Expiry Reaper - periodic reclamation of finished jobs and their artifacts

use crate::application::dispatcher::constants::{DEFAULT_SWEEP_PERIOD, DEFAULT_TTL};
use crate::application::dispatcher::ShutdownToken;
use crate::application::registry::TaskRegistry;
use crate::port::TimeProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Expiry Reaper
///
/// On each tick, removes every terminal job whose `completed_at` is older
/// than now minus TTL and deletes its artifact file. Governs only
/// memory/disk reclamation for finished work: Pending/Processing jobs are
/// never reaped regardless of age (stuck-job detection is out of scope).
pub struct Reaper {
    registry: Arc<TaskRegistry>,
    time: Arc<dyn TimeProvider>,
    ttl: Duration,
    period: Duration,
}

impl Reaper {
    pub fn new(
        registry: Arc<TaskRegistry>,
        time: Arc<dyn TimeProvider>,
        ttl: Duration,
        period: Duration,
    ) -> Self {
        Self {
            registry,
            time,
            ttl,
            period,
        }
    }

    pub fn with_defaults(registry: Arc<TaskRegistry>, time: Arc<dyn TimeProvider>) -> Self {
        Self::new(registry, time, DEFAULT_TTL, DEFAULT_SWEEP_PERIOD)
    }

    /// Run the sweep loop (background task)
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            ttl_secs = self.ttl.as_secs(),
            period_secs = self.period.as_secs(),
            "Reaper started"
        );
        let mut tick = interval(self.period);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let reclaimed = self.sweep().await;
                    if reclaimed > 0 {
                        info!(reclaimed, "Reaper sweep completed");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Reaper shutting down");
                    return;
                }
            }
        }
    }

    /// Run one sweep immediately; returns the number of reclaimed jobs.
    ///
    /// Expired entries leave the registry in a single atomic pass, then the
    /// artifact files are deleted. A failed file delete is logged but the
    /// entry stays gone - memory must not grow without bound just because
    /// filesystem cleanup failed.
    pub async fn sweep(&self) -> usize {
        let cutoff = self.time.now_millis() - self.ttl.as_millis() as i64;
        let expired = self.registry.remove_expired(cutoff);
        let mut reclaimed = 0;

        for job in expired {
            if let Some(path) = &job.result_path {
                match tokio::fs::remove_file(path).await {
                    Ok(()) => {
                        debug!(task_id = %job.id, path = %path.display(), "Deleted expired artifact");
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(
                            task_id = %job.id,
                            path = %path.display(),
                            error = %e,
                            "Failed to delete expired artifact"
                        );
                    }
                }
            }
            debug!(task_id = %job.id, state = %job.state, "Reaped expired job");
            reclaimed += 1;
        }
        reclaimed
    }
}
