//! Query results: call chains and the per-table impact report

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A caller path from an outermost method down to a repository method.
///
/// `call_path[0]` is the outermost caller; `line_numbers[i]` is the line at
/// which `call_path[i]` makes its call. No identifier repeats in one chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallChain {
    pub call_path: Vec<String>,
    pub line_numbers: Vec<usize>,
    pub repository_method: String,
    pub table_name: String,
}

impl CallChain {
    pub fn new(
        call_path: Vec<String>,
        line_numbers: Vec<usize>,
        repository_method: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            call_path,
            line_numbers,
            repository_method: repository_method.into(),
            table_name: table_name.into(),
        }
    }

    /// Chain for a repository method nobody calls
    pub fn direct(repository_method: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self::new(Vec::new(), Vec::new(), repository_method, table_name)
    }

    pub fn depth(&self) -> usize {
        self.call_path.len()
    }

    /// Outermost caller, or the repository method itself for a direct chain
    pub fn entry_point(&self) -> &str {
        self.call_path
            .first()
            .map(String::as_str)
            .unwrap_or(&self.repository_method)
    }
}

impl fmt::Display for CallChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, caller) in self.call_path.iter().enumerate() {
            write!(f, "{caller}")?;
            if let Some(line) = self.line_numbers.get(i) {
                write!(f, " [line {line}]")?;
            }
            write!(f, " -> ")?;
        }
        write!(f, "{} [Table: {}]", self.repository_method, self.table_name)
    }
}

/// Flat table -> statement -> business method pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableImpact {
    pub module: String,
    pub mapper_file: PathBuf,
    pub mapper_namespace: String,
    pub statement_id: String,
    pub business_class: String,
    pub business_method: String,
}

impl TableImpact {
    pub fn fully_qualified_statement(&self) -> String {
        format!("{}.{}", self.mapper_namespace, self.statement_id)
    }

    pub fn fully_qualified_business_method(&self) -> String {
        format!("{}.{}", self.business_class, self.business_method)
    }
}

/// Everything one table query produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactAnalysisResult {
    pub table_name: String,
    pub impacts: Vec<TableImpact>,
    pub call_chains: Vec<CallChain>,
    pub unresolved_repository_references: Vec<String>,
    pub warnings: Vec<String>,
}

impl ImpactAnalysisResult {
    pub fn empty(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            impacts: Vec::new(),
            call_chains: Vec::new(),
            unresolved_repository_references: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Read-only counts over the built indices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatistics {
    pub tables_indexed: usize,
    pub repository_mappings: usize,
    pub resolved_repository_methods: usize,
    pub unresolved_repository_methods: usize,
    pub distinct_callees: usize,
    pub total_call_references: usize,
}

impl IndexStatistics {
    /// Label/value pairs in display order
    pub fn entries(&self) -> [(&'static str, usize); 6] {
        [
            ("Tables indexed", self.tables_indexed),
            ("Repository mappings", self.repository_mappings),
            ("Resolved repository methods", self.resolved_repository_methods),
            ("Unresolved repository methods", self.unresolved_repository_methods),
            ("Distinct callees", self.distinct_callees),
            ("Total call references", self.total_call_references),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chain_serializes_with_external_field_names() {
        let chain = CallChain::new(
            vec!["OrderServiceImpl.getOrder".into()],
            vec![42],
            "OrderDao.findById",
            "ORDERS",
        );
        let value = serde_json::to_value(&chain).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "callPath": ["OrderServiceImpl.getOrder"],
                "lineNumbers": [42],
                "repositoryMethod": "OrderDao.findById",
                "tableName": "ORDERS"
            })
        );
    }

    #[test]
    fn test_entry_point_of_direct_chain_is_repository_method() {
        let chain = CallChain::direct("OrderDao.findById", "ORDERS");
        assert_eq!(chain.depth(), 0);
        assert_eq!(chain.entry_point(), "OrderDao.findById");
    }

    #[test]
    fn test_chain_display() {
        let chain = CallChain::new(
            vec!["A.run".into(), "B.load".into()],
            vec![10, 20],
            "OrderDao.findById",
            "ORDERS",
        );
        assert_eq!(
            chain.to_string(),
            "A.run [line 10] -> B.load [line 20] -> OrderDao.findById [Table: ORDERS]"
        );
    }

    #[test]
    fn test_result_json_shape() {
        let result = ImpactAnalysisResult::empty("AUDIT_LOG")
            .with_warning("No mapper methods found for table: AUDIT_LOG");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["tableName"], "AUDIT_LOG");
        assert_eq!(value["callChains"], serde_json::json!([]));
        assert_eq!(value["unresolvedRepositoryReferences"], serde_json::json!([]));
        assert_eq!(value["warnings"][0], "No mapper methods found for table: AUDIT_LOG");
    }
}
