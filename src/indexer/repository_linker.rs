//! Links mapper statements to the repository methods that run them.
//!
//! Convention: a mapper `<dir>/xml/OrderDao.xml` belongs to the class in
//! `<dir>/OrderDao.java`, and a statement id names a method of that class.

use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info_span;

use crate::cache::{combine_fingerprints, content_fingerprint, CacheStore};
use crate::config::{IndexingConfig, SharedLayerPolicy};
use crate::core::{MapperStatement, RepositoryMethodRef, TableIndex, TableRepositoryMapping};
use crate::errors::Result;
use crate::observability::{CancellationToken, DiagnosticSink};
use crate::parsers::java;

/// Presumed repository source for a mapper file: the mapper's stem with a
/// `.java` extension, one directory above the mapper's directory.
pub fn repository_file_for(mapper_path: &Path) -> Option<PathBuf> {
    let stem = mapper_path.file_stem()?.to_str()?;
    let grandparent = mapper_path.parent()?.parent()?;
    Some(grandparent.join(format!("{stem}.java")))
}

pub struct RepositoryLinker {
    policy: SharedLayerPolicy,
    /// Repository source path -> declared method names, `None` when missing
    declared: DashMap<PathBuf, Option<Arc<BTreeSet<String>>>>,
}

impl RepositoryLinker {
    pub fn new(policy: SharedLayerPolicy) -> Self {
        Self {
            policy,
            declared: DashMap::new(),
        }
    }

    /// Build the mapping for every table of `index`.
    ///
    /// Reuses a complete, non-empty snapshot whose fingerprint covers both
    /// the table index and every candidate repository file.
    pub fn link(
        &self,
        index: &TableIndex,
        table_fingerprint: &str,
        config: &IndexingConfig,
        store: &CacheStore,
        sink: &dyn DiagnosticSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<TableRepositoryMapping>> {
        let _span = info_span!("repository_linker").entered();

        let fingerprint = self.fingerprint(index, table_fingerprint);
        let snapshot = store.mapping();
        if let Some(snapshot) = &snapshot {
            if let Some(mappings) = snapshot.load::<Vec<TableRepositoryMapping>>(&fingerprint, sink) {
                if !mappings.is_empty() {
                    sink.info(&format!(
                        "Loaded repository mapping from cache ({} tables)",
                        mappings.len()
                    ));
                    return Ok(mappings);
                }
            }
            snapshot.write_or_warn(&fingerprint, false, &[] as &[TableRepositoryMapping], sink);
        }

        let tables: Vec<(&str, &[MapperStatement])> = index.iter().collect();
        let mut mappings = Vec::with_capacity(tables.len());

        for chunk in tables.chunks(config.mapping_flush_batch.max(1)) {
            cancel.check()?;
            let linked: Vec<TableRepositoryMapping> = chunk
                .par_iter()
                .map(|(table, statements)| self.link_table(table, statements, sink))
                .collect();
            mappings.extend(linked);
            match &snapshot {
                Some(snapshot) if mappings.len() < tables.len() => {
                    snapshot.write_or_warn(&fingerprint, false, &mappings, sink);
                }
                _ => {}
            }
        }
        cancel.check()?;

        if let Some(snapshot) = &snapshot {
            snapshot.write_or_warn(&fingerprint, true, &mappings, sink);
        }
        let unresolved: usize = mappings.iter().map(|m| m.unresolved_methods().count()).sum();
        sink.info(&format!(
            "Linked {} tables ({unresolved} unresolved repository methods)",
            mappings.len()
        ));
        Ok(mappings)
    }

    /// Link the statements of one table, in table index order
    pub fn link_table(
        &self,
        table: &str,
        statements: &[MapperStatement],
        sink: &dyn DiagnosticSink,
    ) -> TableRepositoryMapping {
        let mut mapping = TableRepositoryMapping::new(table);
        for statement in statements {
            let method = self.link_statement(statement, sink);
            mapping.record(statement, method);
        }
        mapping
    }

    pub fn link_statement(
        &self,
        statement: &MapperStatement,
        sink: &dyn DiagnosticSink,
    ) -> RepositoryMethodRef {
        let class = statement.mapper_stem().unwrap_or_default().to_string();
        if !self.policy.is_repository(&class) {
            sink.debug(&format!(
                "{class} does not follow repository naming conventions"
            ));
        }

        let methods = repository_file_for(&statement.mapper_path)
            .and_then(|path| self.declared_methods(&path, sink));
        match methods {
            None => RepositoryMethodRef::missing_class(class),
            Some(methods) if methods.contains(&statement.id) => {
                RepositoryMethodRef::resolved(class, statement.id.clone())
            }
            Some(_) => RepositoryMethodRef::missing_method(class, statement.id.clone()),
        }
    }

    fn declared_methods(
        &self,
        path: &Path,
        sink: &dyn DiagnosticSink,
    ) -> Option<Arc<BTreeSet<String>>> {
        if let Some(cached) = self.declared.get(path) {
            return cached.value().clone();
        }
        let methods = if path.is_file() {
            match java::parse_file(path) {
                Ok(ast) => Some(Arc::new(java::declared_method_names(&ast))),
                Err(e) => {
                    sink.warn(&format!("Could not read repository class: {e}"));
                    None
                }
            }
        } else {
            None
        };
        self.declared
            .entry(path.to_path_buf())
            .or_insert(methods)
            .value()
            .clone()
    }

    fn fingerprint(&self, index: &TableIndex, table_fingerprint: &str) -> String {
        let candidates: HashSet<PathBuf> = index
            .iter()
            .flat_map(|(_, statements)| statements.iter())
            .filter_map(|s| repository_file_for(&s.mapper_path))
            .collect();
        let candidates: Vec<PathBuf> = candidates.into_iter().collect();
        let repository_fingerprint = content_fingerprint(&candidates);
        combine_fingerprints(&[table_fingerprint, &repository_fingerprint])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayersConfig, NamingConventionPolicy};
    use crate::core::StatementKind;
    use crate::indexer::testing::FlushRecorder;
    use crate::observability::MemorySink;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn statement(mapper_path: &Path, id: &str) -> MapperStatement {
        MapperStatement {
            module: "shop".into(),
            mapper_path: mapper_path.to_path_buf(),
            namespace: "com.shop.dao.OrderDao".into(),
            id: id.into(),
            kind: StatementKind::Select,
            raw_sql: "SELECT * FROM orders".into(),
        }
    }

    fn linker() -> RepositoryLinker {
        RepositoryLinker::new(NamingConventionPolicy::shared(LayersConfig::default()))
    }

    fn fixture() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let dao_dir = temp.path().join("dao");
        fs::create_dir_all(dao_dir.join("xml")).unwrap();
        fs::write(
            dao_dir.join("OrderDao.java"),
            indoc! {"
                package com.shop.dao;

                public interface OrderDao {
                    Order findById(long id);
                    void save(Order order);
                }
            "},
        )
        .unwrap();
        let mapper = dao_dir.join("xml").join("OrderDao.xml");
        fs::write(&mapper, "<mapper namespace=\"com.shop.dao.OrderDao\"/>").unwrap();
        (temp, mapper)
    }

    #[test]
    fn test_repository_file_convention() {
        assert_eq!(
            repository_file_for(Path::new("/p/dao/xml/OrderDao.xml")),
            Some(PathBuf::from("/p/dao/OrderDao.java"))
        );
    }

    #[test]
    fn test_link_statement_outcomes() {
        let (_temp, mapper) = fixture();
        let sink = MemorySink::new();
        let linker = linker();

        assert_eq!(
            linker.link_statement(&statement(&mapper, "findById"), &sink),
            RepositoryMethodRef::resolved("OrderDao", "findById")
        );
        assert_eq!(
            linker
                .link_statement(&statement(&mapper, "purge"), &sink)
                .to_string(),
            "[N/A]-OrderDao.purge"
        );

        let orphan = mapper.with_file_name("LegacyDao.xml");
        assert_eq!(
            linker
                .link_statement(&statement(&orphan, "findAll"), &sink)
                .to_string(),
            "[N/A]-LegacyDao"
        );
    }

    #[test]
    fn test_link_table_keeps_statement_order() {
        let (_temp, mapper) = fixture();
        let statements = vec![
            statement(&mapper, "save"),
            statement(&mapper, "purge"),
            statement(&mapper, "findById"),
        ];
        let mapping = linker().link_table("ORDERS", &statements, &MemorySink::new());

        let rendered: Vec<String> = mapping
            .repository_methods
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            rendered,
            vec!["OrderDao.save", "[N/A]-OrderDao.purge", "OrderDao.findById"]
        );
        assert_eq!(mapping.repository_classes.len(), 1);
        assert_eq!(mapping.mapper_files.len(), 1);
        assert_eq!(
            mapping.method_for(&statements[1]).map(ToString::to_string).as_deref(),
            Some("[N/A]-OrderDao.purge")
        );
    }

    #[test]
    fn test_unconventional_name_is_only_a_debug_note() {
        let temp = TempDir::new().unwrap();
        let mapper = temp.path().join("x/xml/OrderQueries.xml");
        let sink = MemorySink::new();
        let linked = linker().link_statement(&statement(&mapper, "q"), &sink);

        assert_eq!(linked.to_string(), "[N/A]-OrderQueries");
        assert!(sink.contains("does not follow repository naming conventions"));
        assert!(sink.warnings().is_empty());
    }

    fn three_tables(mapper: &Path) -> TableIndex {
        let mut index = TableIndex::new();
        index.insert("AUDIT_LOG", statement(mapper, "save"));
        index.insert("ITEMS", statement(mapper, "findById"));
        index.insert("ORDERS", statement(mapper, "findById"));
        index
    }

    fn batch_of_one() -> IndexingConfig {
        IndexingConfig {
            mapping_flush_batch: 1,
            ..IndexingConfig::default()
        }
    }

    #[test]
    fn test_link_flushes_after_every_batch() {
        let (temp, mapper) = fixture();
        let store = CacheStore::at(temp.path().join("cache"), true);
        let recorder = FlushRecorder::new(store.mapping().unwrap().path());

        let mappings = linker()
            .link(
                &three_tables(&mapper),
                "fp",
                &batch_of_one(),
                &store,
                &recorder,
                &CancellationToken::new(),
            )
            .unwrap();

        let flushes: Vec<(bool, usize)> = recorder
            .flushes()
            .iter()
            .map(|(complete, data)| (*complete, data.as_array().unwrap().len()))
            .collect();
        assert_eq!(flushes, vec![(false, 0), (false, 1), (false, 2), (true, 3)]);
        let last = recorder.flushes().pop().unwrap().1;
        assert_eq!(last[0]["table_name"], "AUDIT_LOG");
        assert_eq!(last[2]["table_name"], "ORDERS");
        assert_eq!(mappings.len(), 3);
    }

    #[test]
    fn test_cancelled_link_leaves_incomplete_snapshot() {
        let (temp, mapper) = fixture();
        let store = CacheStore::at(temp.path().join("cache"), true);
        let snapshot = store.mapping().unwrap();
        let cancel = CancellationToken::new();
        // marker, then the first table
        let recorder = FlushRecorder::new(snapshot.path()).cancelling_after(2, cancel.clone());

        let result = linker().link(
            &three_tables(&mapper),
            "fp",
            &batch_of_one(),
            &store,
            &recorder,
            &cancel,
        );

        assert!(matches!(result, Err(crate::errors::ImpactError::Cancelled)));
        let left: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(snapshot.path()).unwrap()).unwrap();
        assert_eq!(left["complete"], false);
        assert_eq!(left["data"].as_array().unwrap().len(), 1);

        let sink = MemorySink::new();
        let relinked = linker()
            .link(
                &three_tables(&mapper),
                "fp",
                &batch_of_one(),
                &store,
                &sink,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(relinked.len(), 3);
        assert!(sink.contains("is incomplete, rebuilding"));
    }

    #[test]
    fn test_link_uses_cache_when_fingerprint_matches() {
        let (temp, mapper) = fixture();
        let mut index = TableIndex::new();
        index.insert("ORDERS", statement(&mapper, "findById"));
        let store = CacheStore::at(temp.path().join("cache"), true);
        let sink = MemorySink::new();
        let cancel = CancellationToken::new();

        let first = linker()
            .link(&index, "fp", &IndexingConfig::default(), &store, &sink, &cancel)
            .unwrap();
        let second = linker()
            .link(&index, "fp", &IndexingConfig::default(), &store, &sink, &cancel)
            .unwrap();

        assert_eq!(first, second);
        assert!(sink.contains("Loaded repository mapping from cache"));
    }
}
