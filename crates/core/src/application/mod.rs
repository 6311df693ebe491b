// Application Layer - Use Cases and Orchestration

pub mod dispatcher;
pub mod reaper;
pub mod registry;
pub mod submit;

// Re-exports
pub use dispatcher::{shutdown_channel, DispatchConfig, Dispatcher, ShutdownSender, ShutdownToken};
pub use reaper::Reaper;
pub use registry::{QueueSnapshot, TaskRegistry};
pub use submit::{
    submission_channel, SubmitRequest, Submission, SubmissionReceiver, SubmissionSender,
};
