//! Table index builder: mapper statements grouped by the tables they touch.

use rayon::prelude::*;
use std::path::PathBuf;
use tracing::info_span;

use crate::cache::{content_fingerprint, CacheStore};
use crate::config::IndexingConfig;
use crate::core::{MapperStatement, Module, TableIndex};
use crate::errors::Result;
use crate::observability::{CancellationToken, DiagnosticSink};
use crate::parsers::{extract_table_names, parse_mapper_file};
use crate::scanner::MapperLocator;

/// Result of building (or reloading) the table index
#[derive(Debug)]
pub struct TableIndexBuild {
    pub index: TableIndex,
    /// Fingerprint of the mapper files the index was built from
    pub fingerprint: String,
    pub mapper_files: usize,
    pub from_cache: bool,
}

/// Aggregate every mapper file of `modules` into table -> statements.
///
/// A complete cached index with a matching fingerprint is returned as is.
/// Otherwise files are parsed in parallel and merged in path order; the
/// snapshot is rewritten each time `table_flush_batch` more tables appear,
/// and once more, marked complete, at the end.
pub fn build_table_index(
    modules: &[Module],
    config: &IndexingConfig,
    store: &CacheStore,
    sink: &dyn DiagnosticSink,
    cancel: &CancellationToken,
) -> Result<TableIndexBuild> {
    let _span = info_span!("table_index").entered();

    let locator = MapperLocator::from_config(config)?;
    let files = locator.locate_all(modules);
    let paths: Vec<PathBuf> = files.iter().map(|(_, path)| path.clone()).collect();
    let fingerprint = content_fingerprint(&paths);
    sink.info(&format!("Found {} mapper files", files.len()));

    let snapshot = store.table_index();
    if let Some(snapshot) = &snapshot {
        if let Some(index) = snapshot.load::<TableIndex>(&fingerprint, sink) {
            if !index.is_empty() {
                sink.info(&format!(
                    "Loaded table index from cache ({} tables)",
                    index.len()
                ));
                return Ok(TableIndexBuild {
                    index,
                    fingerprint,
                    mapper_files: files.len(),
                    from_cache: true,
                });
            }
        }
        // mark the rebuild as in progress
        snapshot.write_or_warn(&fingerprint, false, &TableIndex::new(), sink);
    }

    let parsed: Vec<Option<Vec<MapperStatement>>> = files
        .par_iter()
        .map(|(module, path)| {
            if cancel.is_cancelled() {
                return None;
            }
            match parse_mapper_file(module, path, sink) {
                Ok(statements) => Some(statements),
                Err(e) => {
                    sink.warn(&format!("Skipping mapper: {e}"));
                    None
                }
            }
        })
        .collect();
    cancel.check()?;

    let batch = config.table_flush_batch.max(1);
    let mut index = TableIndex::new();
    let mut new_tables = 0usize;

    for statements in parsed.into_iter().flatten() {
        cancel.check()?;
        for statement in statements {
            for table in extract_table_names(&statement.raw_sql) {
                if index.insert(table, statement.clone()) {
                    new_tables += 1;
                    if new_tables % batch == 0 {
                        if let Some(snapshot) = &snapshot {
                            snapshot.write_or_warn(&fingerprint, false, &index, sink);
                        }
                    }
                }
            }
        }
    }

    if let Some(snapshot) = &snapshot {
        snapshot.write_or_warn(&fingerprint, true, &index, sink);
    }
    sink.info(&format!(
        "Indexed {} tables from {} statements",
        index.len(),
        index.statement_count()
    ));

    Ok(TableIndexBuild {
        index,
        fingerprint,
        mapper_files: files.len(),
        from_cache: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::testing::FlushRecorder;
    use crate::observability::MemorySink;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_mapper(root: &Path, name: &str, body: &str) {
        let path = root.join("src/dao/xml").join(format!("{name}.xml"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!("<mapper namespace=\"com.shop.dao.{name}\">{body}</mapper>"),
        )
        .unwrap();
    }

    fn module(root: &Path) -> Module {
        Module::new("shop", root, Some(root.join("src")), None)
    }

    #[test]
    fn test_build_merges_tables_across_files() {
        let temp = TempDir::new().unwrap();
        write_mapper(
            temp.path(),
            "OrderDao",
            r#"<select id="findById">SELECT * FROM orders o JOIN customers c ON o.cid = c.id</select>"#,
        );
        write_mapper(
            temp.path(),
            "AuditDao",
            r#"<insert id="log">INSERT INTO audit_log VALUES (#{a})</insert>
               <select id="forOrder">SELECT * FROM audit_log a, orders o</select>"#,
        );

        let build = build_table_index(
            &[module(temp.path())],
            &IndexingConfig::default(),
            &CacheStore::disabled(),
            &MemorySink::new(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert!(!build.from_cache);
        assert_eq!(build.mapper_files, 2);
        let tables: Vec<_> = build.index.tables().collect();
        assert_eq!(tables, vec!["AUDIT_LOG", "CUSTOMERS", "ORDERS"]);
        assert_eq!(build.index.get("ORDERS").unwrap().len(), 2);
        assert_eq!(build.index.get("AUDIT_LOG").unwrap().len(), 2);
    }

    #[test]
    fn test_broken_mapper_is_skipped() {
        let temp = TempDir::new().unwrap();
        write_mapper(temp.path(), "OrderDao", r#"<select id="a">SELECT * FROM orders</select>"#);
        write_mapper(temp.path(), "BrokenDao", r#"<select id="a">SELECT * FROM x</update>"#);
        let sink = MemorySink::new();

        let build = build_table_index(
            &[module(temp.path())],
            &IndexingConfig::default(),
            &CacheStore::disabled(),
            &sink,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(build.index.tables().collect::<Vec<_>>(), vec!["ORDERS"]);
        assert!(sink.contains("Skipping mapper"));
    }

    fn flush_config(table_flush_batch: usize) -> IndexingConfig {
        IndexingConfig {
            table_flush_batch,
            ..IndexingConfig::default()
        }
    }

    fn tables_of(data: &serde_json::Value) -> Vec<String> {
        data.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_every_new_table_flushes_an_incomplete_snapshot() {
        let temp = TempDir::new().unwrap();
        write_mapper(
            temp.path(),
            "OrderDao",
            r#"<select id="all">SELECT * FROM a_tab, b_tab, c_tab</select>"#,
        );
        let store = CacheStore::at(temp.path().join("cache"), true);
        let recorder = FlushRecorder::new(store.table_index().unwrap().path());

        let build = build_table_index(
            &[module(temp.path())],
            &flush_config(1),
            &store,
            &recorder,
            &CancellationToken::new(),
        )
        .unwrap();

        let flushes: Vec<(bool, Vec<String>)> = recorder
            .flushes()
            .iter()
            .map(|(complete, data)| (*complete, tables_of(data)))
            .collect();
        let abc = vec!["A_TAB".to_string(), "B_TAB".into(), "C_TAB".into()];
        assert_eq!(
            flushes,
            vec![
                (false, vec![]),
                (false, vec!["A_TAB".to_string()]),
                (false, vec!["A_TAB".to_string(), "B_TAB".into()]),
                (false, abc.clone()),
                (true, abc),
            ]
        );
        assert_eq!(build.index.len(), 3);
        assert!(recorder
            .snapshots()
            .iter()
            .all(|s| s["fingerprint"] == build.fingerprint.as_str()));
    }

    #[test]
    fn test_flush_waits_for_a_full_batch() {
        let temp = TempDir::new().unwrap();
        write_mapper(
            temp.path(),
            "OrderDao",
            r#"<select id="all">SELECT * FROM a_tab, b_tab, c_tab</select>"#,
        );
        let store = CacheStore::at(temp.path().join("cache"), true);
        let recorder = FlushRecorder::new(store.table_index().unwrap().path());

        build_table_index(
            &[module(temp.path())],
            &flush_config(2),
            &store,
            &recorder,
            &CancellationToken::new(),
        )
        .unwrap();

        let sizes: Vec<(bool, usize)> = recorder
            .flushes()
            .iter()
            .map(|(complete, data)| (*complete, tables_of(data).len()))
            .collect();
        assert_eq!(sizes, vec![(false, 0), (false, 2), (true, 3)]);
    }

    #[test]
    fn test_cancel_between_files_leaves_partial_snapshot() {
        let temp = TempDir::new().unwrap();
        write_mapper(temp.path(), "AuditDao", r#"<select id="a">SELECT * FROM audit_log</select>"#);
        write_mapper(temp.path(), "OrderDao", r#"<select id="a">SELECT * FROM orders</select>"#);
        let store = CacheStore::at(temp.path().join("cache"), true);
        let snapshot = store.table_index().unwrap();
        let cancel = CancellationToken::new();
        // marker, then the first table
        let recorder = FlushRecorder::new(snapshot.path()).cancelling_after(2, cancel.clone());

        let result = build_table_index(
            &[module(temp.path())],
            &flush_config(1),
            &store,
            &recorder,
            &cancel,
        );

        assert!(matches!(result, Err(crate::errors::ImpactError::Cancelled)));
        let left: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(snapshot.path()).unwrap()).unwrap();
        assert_eq!(left["complete"], false);
        assert_eq!(tables_of(&left["data"]).len(), 1);
        assert!(snapshot
            .load::<TableIndex>("", &MemorySink::new())
            .is_none());
    }

    #[test]
    fn test_cancelled_build() {
        let temp = TempDir::new().unwrap();
        write_mapper(temp.path(), "OrderDao", r#"<select id="a">SELECT * FROM orders</select>"#);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = build_table_index(
            &[module(temp.path())],
            &IndexingConfig::default(),
            &CacheStore::disabled(),
            &MemorySink::new(),
            &cancel,
        );
        assert!(matches!(result, Err(crate::errors::ImpactError::Cancelled)));
    }
}
