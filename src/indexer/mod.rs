//! Index builders.
//!
//! Each builder parses its inputs in parallel and merges the per-file
//! results through a single writer, so the shared structures never see
//! concurrent mutation.

pub mod call_sites;
pub mod repository_linker;
pub mod table_index;

pub use call_sites::{extract_call_sites, CallSiteIndexer};
pub use repository_linker::{repository_file_for, RepositoryLinker};
pub use table_index::{build_table_index, TableIndexBuild};

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;
    use std::path::PathBuf;

    use crate::observability::{CancellationToken, DiagnosticSink, Severity};

    /// Re-reads a snapshot file every time a flush is reported, and can
    /// cancel the build once a given number of flushes were seen.
    pub struct FlushRecorder {
        path: PathBuf,
        snapshots: Mutex<Vec<serde_json::Value>>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl FlushRecorder {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                snapshots: Mutex::new(Vec::new()),
                cancel_after: None,
            }
        }

        pub fn cancelling_after(mut self, flushes: usize, cancel: CancellationToken) -> Self {
            self.cancel_after = Some((flushes, cancel));
            self
        }

        pub fn snapshots(&self) -> Vec<serde_json::Value> {
            self.snapshots.lock().clone()
        }

        /// `(complete, data)` of every recorded flush
        pub fn flushes(&self) -> Vec<(bool, serde_json::Value)> {
            self.snapshots()
                .into_iter()
                .map(|s| (s["complete"].as_bool().unwrap(), s["data"].clone()))
                .collect()
        }
    }

    impl DiagnosticSink for FlushRecorder {
        fn emit(&self, severity: Severity, message: &str) {
            if severity != Severity::Debug || !message.starts_with("Flushed") {
                return;
            }
            let text = std::fs::read_to_string(&self.path).unwrap();
            let mut snapshots = self.snapshots.lock();
            snapshots.push(serde_json::from_str(&text).unwrap());
            if let Some((flushes, cancel)) = &self.cancel_after {
                if snapshots.len() >= *flushes {
                    cancel.cancel();
                }
            }
        }
    }
}
