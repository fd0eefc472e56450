//! Append-only JSON-lines log of discovered call sites.

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::CallReference;
use crate::errors::{ImpactError, Result};
use crate::observability::DiagnosticSink;

/// One line of the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLogRecord {
    pub callee: String,
    pub caller: String,
    pub file: PathBuf,
    pub line: usize,
}

impl CallLogRecord {
    pub fn new(callee: &str, reference: &CallReference) -> Self {
        Self {
            callee: callee.to_string(),
            caller: reference.caller.clone(),
            file: reference.file.clone(),
            line: reference.line,
        }
    }
}

/// Buffers records and appends them to the log a batch at a time.
///
/// After the first write failure the appender only keeps counting; the
/// in-memory index is unaffected.
pub struct CallLogAppender {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    pending: Vec<CallLogRecord>,
    batch_size: usize,
    written: usize,
}

impl CallLogAppender {
    /// Truncate the log at `path` and start appending to it
    pub fn create(path: &Path, batch_size: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ImpactError::io(parent, e))?;
        }
        File::create(path).map_err(|e| ImpactError::io(path, e))?;
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| ImpactError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
            pending: Vec::with_capacity(batch_size),
            batch_size: batch_size.max(1),
            written: 0,
        })
    }

    pub fn push(&mut self, record: CallLogRecord, sink: &dyn DiagnosticSink) {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            self.flush(sink);
        }
    }

    /// Append everything pending and flush the file
    pub fn flush(&mut self, sink: &dyn DiagnosticSink) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        match write_batch(writer, &batch) {
            Ok(()) => self.written += batch.len(),
            Err(e) => {
                sink.warn(&format!(
                    "Failed to append to call log {}: {e}; continuing in memory",
                    self.path.display()
                ));
                self.writer = None;
            }
        }
    }

    /// Records successfully appended so far
    pub fn written(&self) -> usize {
        self.written
    }
}

fn write_batch(writer: &mut BufWriter<File>, batch: &[CallLogRecord]) -> std::io::Result<()> {
    for record in batch {
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Read every well-formed record from a log; a torn last line is skipped
pub fn read_call_log(path: &Path) -> Result<Vec<CallLogRecord>> {
    let file = File::open(path).map_err(|e| ImpactError::io(path, e))?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| ImpactError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::debug!("Skipping malformed call log line: {}", e),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemorySink;
    use tempfile::TempDir;

    fn record(line: usize) -> CallLogRecord {
        CallLogRecord::new(
            "OrderDao.findById",
            &CallReference::new("OrderService.get", "OrderService.java", line),
        )
    }

    #[test]
    fn test_batches_are_appended_and_flushed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs/call_sites.jsonl");
        let sink = MemorySink::new();

        let mut appender = CallLogAppender::create(&path, 2).unwrap();
        appender.push(record(1), &sink);
        assert_eq!(appender.written(), 0);
        appender.push(record(2), &sink);
        assert_eq!(appender.written(), 2);
        assert_eq!(read_call_log(&path).unwrap().len(), 2);

        appender.push(record(3), &sink);
        appender.flush(&sink);
        assert_eq!(read_call_log(&path).unwrap(), vec![record(1), record(2), record(3)]);
    }

    #[test]
    fn test_create_truncates_previous_log() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("call_sites.jsonl");
        fs::write(&path, "{\"stale\":true}\n").unwrap();

        let mut appender = CallLogAppender::create(&path, 10).unwrap();
        appender.push(record(7), &MemorySink::new());
        appender.flush(&MemorySink::new());
        assert_eq!(read_call_log(&path).unwrap(), vec![record(7)]);
    }

    #[test]
    fn test_torn_line_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("call_sites.jsonl");
        let good = serde_json::to_string(&record(1)).unwrap();
        fs::write(&path, format!("{good}\n{{\"callee\":\"X")).unwrap();
        assert_eq!(read_call_log(&path).unwrap(), vec![record(1)]);
    }
}
