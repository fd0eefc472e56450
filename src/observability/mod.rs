//! Diagnostics and cancellation plumbing shared by every component.
//!
//! Components never consult a global logging switch. They receive a
//! [`DiagnosticSink`] and report through it; the binary decides where the
//! messages end up by installing a `tracing` subscriber.
//!
//! ```ignore
//! use impactmap::observability::{MemorySink, DiagnosticSink};
//!
//! let sink = MemorySink::new();
//! sink.warn("Missing namespace in OrderDao.xml");
//! assert_eq!(sink.warnings().len(), 1);
//! ```

pub mod cancel;
pub mod sink;

pub use cancel::CancellationToken;
pub use sink::{Diagnostic, DiagnosticSink, MemorySink, Severity, SharedSink, TracingSink};
