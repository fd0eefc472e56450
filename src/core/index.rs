//! In-memory index structures shared by the indexers and the analyzer

use super::types::{simple_type_name, split_method_identifier, CallReference, MapperStatement};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Normalized table name -> statements referencing it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableIndex {
    tables: BTreeMap<String, Vec<MapperStatement>>,
}

impl TableIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `statement` references `table`.
    ///
    /// Returns `true` when the table was not indexed before. A statement is
    /// recorded at most once per table.
    pub fn insert(&mut self, table: impl Into<String>, statement: MapperStatement) -> bool {
        let table = table.into();
        let is_new_table = !self.tables.contains_key(&table);
        let statements = self.tables.entry(table).or_default();
        if !statements.contains(&statement) {
            statements.push(statement);
        }
        is_new_table
    }

    pub fn get(&self, table: &str) -> Option<&[MapperStatement]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MapperStatement])> {
        self.tables
            .iter()
            .map(|(table, statements)| (table.as_str(), statements.as_slice()))
    }

    pub fn statement_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

/// Reverse call graph: callee identifier -> every call site invoking it.
///
/// Call sites are never deduplicated. A secondary index keyed by
/// `SimpleType.method` lets convention-named repository methods (which carry
/// no package) find their fully qualified callee entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallSiteIndex {
    callers: HashMap<String, Vec<CallReference>>,
    #[serde(skip)]
    by_simple_name: HashMap<String, Vec<String>>,
}

impl CallSiteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, callee: impl Into<String>, reference: CallReference) {
        self.callers.entry(callee.into()).or_default().push(reference);
    }

    /// Sort each caller list and rebuild the simple-name index.
    ///
    /// Must be called once after the last insert; traversal order then no
    /// longer depends on the order workers finished in.
    pub fn finalize(&mut self) {
        self.by_simple_name.clear();
        for (callee, references) in self.callers.iter_mut() {
            references.sort();
            let simple = simple_method_key(callee);
            self.by_simple_name
                .entry(simple)
                .or_default()
                .push(callee.clone());
        }
        for keys in self.by_simple_name.values_mut() {
            keys.sort();
        }
    }

    /// Call sites of exactly `callee`
    pub fn callers(&self, callee: &str) -> &[CallReference] {
        self.callers.get(callee).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Call sites of `callee`, widened to every fully qualified variant when
    /// `callee` names its type without a package.
    pub fn callers_matching(&self, callee: &str) -> Vec<&CallReference> {
        self.matching_callees(callee)
            .into_iter()
            .flat_map(|key| self.callers(key))
            .collect()
    }

    /// Indexed callee keys `callers_matching` reads from, `callee` itself
    /// when nothing wider applies
    pub fn matching_callees<'a>(&'a self, callee: &'a str) -> Vec<&'a str> {
        let is_unqualified = split_method_identifier(callee)
            .map(|(class, _)| !class.contains('.'))
            .unwrap_or(false);
        match self.by_simple_name.get(callee) {
            Some(keys) if is_unqualified => keys.iter().map(String::as_str).collect(),
            _ => vec![callee],
        }
    }

    pub fn distinct_callees(&self) -> usize {
        self.callers.len()
    }

    pub fn total_references(&self) -> usize {
        self.callers.values().map(Vec::len).sum()
    }

    pub fn callees(&self) -> impl Iterator<Item = &str> {
        self.callers.keys().map(String::as_str)
    }
}

fn simple_method_key(callee: &str) -> String {
    match split_method_identifier(callee) {
        Some((class, method)) => format!("{}.{}", simple_type_name(class), method),
        None => callee.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StatementKind;
    use std::path::PathBuf;

    fn statement(id: &str) -> MapperStatement {
        MapperStatement {
            module: "core".into(),
            mapper_path: PathBuf::from("/m/OrderDao.xml"),
            namespace: "com.shop.OrderDao".into(),
            id: id.into(),
            kind: StatementKind::Select,
            raw_sql: String::new(),
        }
    }

    #[test]
    fn test_table_index_reports_new_tables() {
        let mut index = TableIndex::new();
        assert!(index.insert("ORDERS", statement("findById")));
        assert!(!index.insert("ORDERS", statement("findAll")));
        assert!(!index.insert("ORDERS", statement("findById")));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("ORDERS").unwrap().len(), 2);
        assert_eq!(index.statement_count(), 2);
    }

    #[test]
    fn test_call_site_index_keeps_every_site() {
        let mut index = CallSiteIndex::new();
        index.insert("OrderDao.findById", CallReference::new("A.run", "A.java", 3));
        index.insert("OrderDao.findById", CallReference::new("A.run", "A.java", 9));
        index.finalize();
        assert_eq!(index.callers("OrderDao.findById").len(), 2);
        assert_eq!(index.total_references(), 2);
        assert_eq!(index.distinct_callees(), 1);
    }

    #[test]
    fn test_callers_matching_widens_unqualified_names() {
        let mut index = CallSiteIndex::new();
        index.insert(
            "com.shop.dao.OrderDao.findById",
            CallReference::new("com.shop.OrderService.get", "S.java", 10),
        );
        index.insert(
            "OrderDao.findById",
            CallReference::new("Legacy.get", "L.java", 4),
        );
        index.finalize();

        assert_eq!(index.callers_matching("OrderDao.findById").len(), 2);
        assert_eq!(
            index.callers_matching("com.shop.dao.OrderDao.findById").len(),
            1
        );
        assert!(index.callers_matching("OrderDao.missing").is_empty());

        assert_eq!(
            index.matching_callees("OrderDao.findById"),
            vec!["OrderDao.findById", "com.shop.dao.OrderDao.findById"]
        );
        assert_eq!(index.matching_callees("OrderDao.missing"), vec!["OrderDao.missing"]);
    }
}
