// Port Layer - Interfaces for external collaborators

pub mod log_sink;
pub mod persister;
pub mod synthesizer;
pub mod time_provider;

// Re-exports
pub use log_sink::{LogLevel, LogSink, NoopLogSink};
pub use persister::{NoopPersister, PersistError, Persister};
pub use synthesizer::{SynthesisError, Synthesizer};
pub use time_provider::TimeProvider;
