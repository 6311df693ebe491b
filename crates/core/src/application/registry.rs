// Task Registry - the single source of truth for job state
//
// The map is the only structure mutated by more than one concurrent actor
// (request handlers, dispatch slots, the reaper). Every operation takes the
// mutex, mutates, stamps timestamps, and releases; the lock is never held
// across an await point.

use crate::domain::error::Result as DomainResult;
use crate::domain::{DomainError, Job, JobState, TaskId};
use crate::port::TimeProvider;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Consistent view of the registry for the /queue surface.
/// Counts always sum to `total`; each id appears in exactly one list.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub total: usize,
    pub pending: Vec<TaskId>,
    pub processing: Vec<TaskId>,
    pub done: Vec<TaskId>,
    pub error: Vec<TaskId>,
}

/// In-memory job registry
///
/// Born empty at process start; all jobs are lost on restart by design
/// (durability is an explicit non-goal). Entries leave the map only through
/// the reaper, or by replacement when a *terminal* id is resubmitted.
pub struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, Job>>,
    time: Arc<dyn TimeProvider>,
}

impl TaskRegistry {
    pub fn new(time: Arc<dyn TimeProvider>) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            time,
        }
    }

    // A poisoned lock only means some holder panicked mid-access; the map
    // itself is still structurally sound, so recover it instead of unwinding
    // every caller.
    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, Job>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a fresh Pending job for `id`.
    ///
    /// Resubmission while a job with the same id is non-terminal is rejected
    /// (the last-write-wins overwrite of the original design races with a
    /// worker already holding the old prompt). A terminal job is replaced.
    pub fn create(&self, id: impl Into<TaskId>, prompt: impl Into<String>) -> DomainResult<()> {
        let id = id.into();
        let mut tasks = self.lock();
        if let Some(existing) = tasks.get(&id) {
            if !existing.state.is_terminal() {
                return Err(DomainError::TaskStillActive(id));
            }
        }
        let job = Job::new(id.clone(), prompt, self.time.now_millis());
        tasks.insert(id, job);
        Ok(())
    }

    /// Look up a job by id (cloned out of the map)
    pub fn get(&self, id: &str) -> Option<Job> {
        self.lock().get(id).cloned()
    }

    /// Transition `id` to Processing
    pub fn set_processing(&self, id: &str) -> DomainResult<()> {
        let mut tasks = self.lock();
        let job = tasks
            .get_mut(id)
            .ok_or_else(|| DomainError::TaskNotFound(id.to_string()))?;
        job.start()
    }

    /// Transition `id` to Done with the artifact path
    pub fn set_done(&self, id: &str, result_path: PathBuf) -> DomainResult<()> {
        let now = self.time.now_millis();
        let mut tasks = self.lock();
        let job = tasks
            .get_mut(id)
            .ok_or_else(|| DomainError::TaskNotFound(id.to_string()))?;
        job.complete(result_path, now)
    }

    /// Transition `id` to Error with a message
    pub fn set_error(&self, id: &str, message: impl Into<String>) -> DomainResult<()> {
        let now = self.time.now_millis();
        let mut tasks = self.lock();
        let job = tasks
            .get_mut(id)
            .ok_or_else(|| DomainError::TaskNotFound(id.to_string()))?;
        job.fail(message, now)
    }

    /// Ids currently in `state`, sorted for stable output
    pub fn list_by_state(&self, state: JobState) -> Vec<TaskId> {
        let tasks = self.lock();
        let mut ids: Vec<TaskId> = tasks
            .values()
            .filter(|j| j.state == state)
            .map(|j| j.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Build the full /queue view under a single lock acquisition
    pub fn snapshot(&self) -> QueueSnapshot {
        let tasks = self.lock();
        let mut snapshot = QueueSnapshot {
            total: tasks.len(),
            pending: Vec::new(),
            processing: Vec::new(),
            done: Vec::new(),
            error: Vec::new(),
        };
        for job in tasks.values() {
            let bucket = match job.state {
                JobState::Pending => &mut snapshot.pending,
                JobState::Processing => &mut snapshot.processing,
                JobState::Done => &mut snapshot.done,
                JobState::Error => &mut snapshot.error,
            };
            bucket.push(job.id.clone());
        }
        snapshot.pending.sort();
        snapshot.processing.sort();
        snapshot.done.sort();
        snapshot.error.sort();
        snapshot
    }

    /// Remove and return every terminal job completed before `cutoff_millis`.
    ///
    /// Removal happens in one locked pass so a resubmission arriving between
    /// scan and delete can never lose a fresh record. Pending/Processing jobs
    /// are never touched regardless of age.
    pub fn remove_expired(&self, cutoff_millis: i64) -> Vec<Job> {
        let mut tasks = self.lock();
        let expired: Vec<TaskId> = tasks
            .values()
            .filter(|j| j.expired_before(cutoff_millis))
            .map(|j| j.id.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|id| tasks.remove(&id))
            .collect()
    }

    /// Remove a single entry (reaper use only)
    pub fn delete(&self, id: &str) -> Option<Job> {
        self.lock().remove(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
