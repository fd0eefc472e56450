//! Injected diagnostic reporting.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

/// Receiver of progress and diagnostic messages.
///
/// Implementations must be cheap to call from rayon workers.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);

    fn debug(&self, message: &str) {
        self.emit(Severity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.emit(Severity::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Severity::Warn, message);
    }
}

/// Sink handle shared between the analyzer and its indexers
pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Forwards every message to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn shared() -> SharedSink {
        Arc::new(Self)
    }
}

impl DiagnosticSink for TracingSink {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(target: "impactmap", "{}", message),
            Severity::Info => tracing::info!(target: "impactmap", "{}", message),
            Severity::Warn => tracing::warn!(target: "impactmap", "{}", message),
        }
    }
}

/// One captured message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Captures messages in memory, used by tests to assert on diagnostics.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.lock().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|d| d.severity == Severity::Warn)
            .map(|d| d.message.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|d| d.message.contains(needle))
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, severity: Severity, message: &str) {
        self.records.lock().push(Diagnostic {
            severity,
            message: message.to_string(),
        });
    }
}
