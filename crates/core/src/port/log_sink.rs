// Log Sink Port
// Fire-and-forget remote logging; unavailability must never affect job
// processing, so the call is synchronous and infallible from the caller's
// point of view (implementations ship in the background).

/// Remote log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Fire-and-forget log sink
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// No-op sink (remote logging disabled)
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Collects log lines for assertions
    pub struct CollectingLogSink {
        lines: Mutex<Vec<(LogLevel, String)>>,
    }

    impl CollectingLogSink {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                lines: Mutex::new(Vec::new()),
            })
        }

        pub fn lines(&self) -> Vec<(LogLevel, String)> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl LogSink for CollectingLogSink {
        fn log(&self, level: LogLevel, message: &str) {
            self.lines.lock().unwrap().push((level, message.to_string()));
        }
    }
}
