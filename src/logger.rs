//! Logger capability used by background listeners and the dispatcher.
//!
//! Listener failures that cannot be returned to a caller are reported here.
//! [`TracingLogger`] forwards to `tracing`; [`MemoryLogger`] keeps records in
//! memory for assertions.

use std::sync::{Arc, Mutex, PoisonError};
use tracing::Level;

/// Sink for diagnostic messages. Must not block callers materially.
pub trait Logger: Send + Sync + std::fmt::Debug {
    /// Record a message at `level`.
    fn log(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

/// Logger that emits through the `tracing` crate.
#[derive(Clone, Debug)]
pub struct TracingLogger {
    component: &'static str,
}

impl TracingLogger {
    /// Create a logger that tags every record with `component`.
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("eventgate")
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        let component = self.component;
        if level == Level::ERROR {
            tracing::error!(target: "eventgate::logger", component, "{message}");
        } else if level == Level::WARN {
            tracing::warn!(target: "eventgate::logger", component, "{message}");
        } else if level == Level::INFO {
            tracing::info!(target: "eventgate::logger", component, "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(target: "eventgate::logger", component, "{message}");
        } else {
            tracing::trace!(target: "eventgate::logger", component, "{message}");
        }
    }
}

/// Logger that stores records in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryLogger {
    records: Arc<Mutex<Vec<(Level, String)>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|(_, m)| m).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}
