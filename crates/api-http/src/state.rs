use std::sync::Arc;

use resona_core::application::{SubmissionSender, TaskRegistry};
use resona_core::port::LogSink;

/// Shared application state available to all handlers via `State<ApiState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct ApiState {
    /// The job registry, single source of truth.
    pub registry: Arc<TaskRegistry>,
    /// Sender half of the FIFO submission queue.
    pub submissions: SubmissionSender,
    /// Remote log sink (fire-and-forget).
    pub log_sink: Arc<dyn LogSink>,
}

impl ApiState {
    pub fn new(
        registry: Arc<TaskRegistry>,
        submissions: SubmissionSender,
        log_sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            registry,
            submissions,
            log_sink,
        }
    }
}
