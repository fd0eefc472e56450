//! On-disk persistence of the built indices.
//!
//! Three artifacts live in one cache directory per analysis root: the table
//! index snapshot, the repository mapping snapshot and the call-site log.
//! Persistence is best effort; every failure degrades to in-memory work.

pub mod cache_location;
pub mod call_log;
pub mod fingerprint;
pub mod snapshot;

pub use cache_location::{CacheLocation, CacheStrategy, CACHE_DIR_ENV};
pub use call_log::{read_call_log, CallLogAppender, CallLogRecord};
pub use fingerprint::{combine_fingerprints, content_fingerprint};
pub use snapshot::{SnapshotFile, SNAPSHOT_VERSION};

use std::path::{Path, PathBuf};

use crate::config::CacheConfig;
use crate::errors::Result;
use crate::observability::DiagnosticSink;

pub const TABLE_INDEX_FILE: &str = "table_statements.json";
pub const MAPPING_FILE: &str = "table_repository_mapping.json";
pub const CALL_LOG_FILE: &str = "call_sites.jsonl";

/// Cache directory of one analysis root, or nothing when caching is off
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    dir: Option<PathBuf>,
    verify_fingerprint: bool,
}

impl CacheStore {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn at(dir: impl Into<PathBuf>, verify_fingerprint: bool) -> Self {
        Self {
            dir: Some(dir.into()),
            verify_fingerprint,
        }
    }

    /// Resolve the store for `root`; an unresolvable location disables
    /// caching with a warning.
    pub fn for_root(root: &Path, config: &CacheConfig, sink: &dyn DiagnosticSink) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        match CacheLocation::resolve(root, config.dir.as_deref()) {
            Ok(location) => {
                sink.debug(&format!(
                    "Using cache directory {}",
                    location.get_cache_path().display()
                ));
                Self::at(location.base_path, config.verify_fingerprint)
            }
            Err(e) => {
                sink.warn(&format!("Cache disabled: {e:#}"));
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn table_index(&self) -> Option<SnapshotFile> {
        self.snapshot(TABLE_INDEX_FILE)
    }

    pub fn mapping(&self) -> Option<SnapshotFile> {
        self.snapshot(MAPPING_FILE)
    }

    pub fn call_log_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(CALL_LOG_FILE))
    }

    fn snapshot(&self, name: &str) -> Option<SnapshotFile> {
        self.dir
            .as_ref()
            .map(|dir| SnapshotFile::new(dir.join(name), self.verify_fingerprint))
    }

    /// Delete all cache artifacts, returning how many existed
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for snapshot in [self.table_index(), self.mapping()].into_iter().flatten() {
            if snapshot.remove()? {
                removed += 1;
            }
        }
        if let Some(log) = self.call_log_path() {
            if SnapshotFile::new(log, false).remove()? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
