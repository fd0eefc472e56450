//! Whole-file JSON snapshots with a validity envelope.
//!
//! Every write overwrites the file in place. A snapshot is reusable only
//! when it was written as complete and its fingerprint matches.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::{ImpactError, Result};
use crate::observability::DiagnosticSink;

/// Bumped whenever the layout of a cached structure changes
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Serialize)]
struct EnvelopeRef<'a, T: ?Sized> {
    version: u32,
    fingerprint: &'a str,
    complete: bool,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    version: u32,
    fingerprint: String,
    complete: bool,
    data: T,
}

/// One snapshot file on disk
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
    verify_fingerprint: bool,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>, verify_fingerprint: bool) -> Self {
        Self {
            path: path.into(),
            verify_fingerprint,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached data if the file exists, parses, is complete and matches
    /// `fingerprint`.
    ///
    /// A file that cannot be parsed is deleted so the next write starts
    /// clean.
    pub fn load<T: DeserializeOwned>(&self, fingerprint: &str, sink: &dyn DiagnosticSink) -> Option<T> {
        if !self.path.exists() {
            return None;
        }

        let envelope: Envelope<T> = match self.read() {
            Ok(envelope) => envelope,
            Err(e) => {
                sink.warn(&format!("Discarding corrupt cache: {e}"));
                if let Err(e) = fs::remove_file(&self.path) {
                    sink.warn(&format!(
                        "Failed to delete corrupt cache {}: {e}",
                        self.path.display()
                    ));
                }
                return None;
            }
        };

        if envelope.version != SNAPSHOT_VERSION {
            sink.debug(&format!(
                "Cache {} has version {}, expected {}",
                self.path.display(),
                envelope.version,
                SNAPSHOT_VERSION
            ));
            return None;
        }
        if !envelope.complete {
            sink.info(&format!(
                "Cache {} is incomplete, rebuilding",
                self.path.display()
            ));
            return None;
        }
        if self.verify_fingerprint && envelope.fingerprint != fingerprint {
            sink.info(&format!(
                "Cache {} is stale, rebuilding",
                self.path.display()
            ));
            return None;
        }
        Some(envelope.data)
    }

    fn read<T: DeserializeOwned>(&self) -> Result<Envelope<T>> {
        let file = File::open(&self.path).map_err(|e| ImpactError::io(&self.path, e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ImpactError::cache(&self.path, e.to_string()))
    }

    /// Overwrite the snapshot with `data`
    pub fn write<T: Serialize + ?Sized>(
        &self,
        fingerprint: &str,
        complete: bool,
        data: &T,
    ) -> Result<()> {
        self.write_inner(fingerprint, complete, data)
            .map_err(|e| ImpactError::cache(&self.path, format!("{e:#}")))
    }

    /// Like [`write`](Self::write), reporting failure as a warning
    pub fn write_or_warn<T: Serialize + ?Sized>(
        &self,
        fingerprint: &str,
        complete: bool,
        data: &T,
        sink: &dyn DiagnosticSink,
    ) {
        match self.write(fingerprint, complete, data) {
            Ok(()) => sink.debug(&format!(
                "Flushed {} (complete: {complete})",
                self.path.display()
            )),
            Err(e) => sink.warn(&e.to_string()),
        }
    }

    fn write_inner<T: Serialize + ?Sized>(
        &self,
        fingerprint: &str,
        complete: bool,
        data: &T,
    ) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory {:?}", parent))?;
        }
        let file = File::create(&self.path).context("Failed to open cache file for writing")?;
        let mut writer = BufWriter::new(file);
        let envelope = EnvelopeRef {
            version: SNAPSHOT_VERSION,
            fingerprint,
            complete,
            data,
        };
        serde_json::to_writer(&mut writer, &envelope).context("Failed to serialize cache")?;
        writer.flush().context("Failed to flush cache file")?;
        Ok(())
    }

    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ImpactError::io(&self.path, e)),
        }
    }
}
