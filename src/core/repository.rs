//! Table to repository-method link records

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::types::MapperStatement;

/// Prefix marking a statement whose access method could not be found
pub const UNRESOLVED_PREFIX: &str = "[N/A]-";

/// The access method presumed to execute one mapper statement.
///
/// Rendered as `Class.method` when resolved, or as the sentinel
/// `[N/A]-Class` / `[N/A]-Class.method` when resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RepositoryMethodRef {
    Resolved {
        class: String,
        method: String,
    },
    Unresolved {
        class: String,
        method: Option<String>,
    },
}

impl RepositoryMethodRef {
    pub fn resolved(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Resolved {
            class: class.into(),
            method: method.into(),
        }
    }

    /// The repository source file does not exist
    pub fn missing_class(class: impl Into<String>) -> Self {
        Self::Unresolved {
            class: class.into(),
            method: None,
        }
    }

    /// The repository class exists but declares no method with this name
    pub fn missing_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Unresolved {
            class: class.into(),
            method: Some(method.into()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn class(&self) -> &str {
        match self {
            Self::Resolved { class, .. } | Self::Unresolved { class, .. } => class,
        }
    }
}

impl fmt::Display for RepositoryMethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved { class, method } => write!(f, "{class}.{method}"),
            Self::Unresolved {
                class,
                method: None,
            } => write!(f, "{UNRESOLVED_PREFIX}{class}"),
            Self::Unresolved {
                class,
                method: Some(method),
            } => write!(f, "{UNRESOLVED_PREFIX}{class}.{method}"),
        }
    }
}

impl From<RepositoryMethodRef> for String {
    fn from(value: RepositoryMethodRef) -> Self {
        value.to_string()
    }
}

impl FromStr for RepositoryMethodRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix(UNRESOLVED_PREFIX) {
            if rest.is_empty() {
                return Err(format!("empty unresolved repository reference: {s}"));
            }
            return Ok(match rest.rsplit_once('.') {
                Some((class, method)) if !class.is_empty() && !method.is_empty() => {
                    Self::missing_method(class, method)
                }
                _ => Self::missing_class(rest),
            });
        }
        match s.rsplit_once('.') {
            Some((class, method)) if !class.is_empty() && !method.is_empty() => {
                Ok(Self::resolved(class, method))
            }
            _ => Err(format!("repository reference without method: {s}")),
        }
    }
}

impl TryFrom<String> for RepositoryMethodRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Per-table link result.
///
/// `repository_methods` lists one access method per linked statement.
/// Attribution back to a statement goes through `statement_methods`, keyed
/// by the statement's fully qualified id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRepositoryMapping {
    pub table_name: String,
    pub mapper_files: BTreeSet<PathBuf>,
    pub repository_classes: BTreeSet<String>,
    pub repository_methods: Vec<RepositoryMethodRef>,
    #[serde(default)]
    pub statement_methods: BTreeMap<String, RepositoryMethodRef>,
}

impl TableRepositoryMapping {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            mapper_files: BTreeSet::new(),
            repository_classes: BTreeSet::new(),
            repository_methods: Vec::new(),
            statement_methods: BTreeMap::new(),
        }
    }

    /// Record `method` as the access method of `statement`.
    ///
    /// The first method recorded for a fully qualified id is kept.
    pub fn record(&mut self, statement: &MapperStatement, method: RepositoryMethodRef) {
        self.mapper_files.insert(statement.mapper_path.clone());
        if method.is_resolved() {
            self.repository_classes.insert(method.class().to_string());
        }
        self.statement_methods
            .entry(statement.fully_qualified_id())
            .or_insert_with(|| method.clone());
        self.repository_methods.push(method);
    }

    /// Access method linked to `statement`, if it was linked at all
    pub fn method_for(&self, statement: &MapperStatement) -> Option<&RepositoryMethodRef> {
        self.statement_methods.get(&statement.fully_qualified_id())
    }

    pub fn resolved_methods(&self) -> impl Iterator<Item = &RepositoryMethodRef> {
        self.repository_methods.iter().filter(|m| m.is_resolved())
    }

    pub fn unresolved_methods(&self) -> impl Iterator<Item = &RepositoryMethodRef> {
        self.repository_methods.iter().filter(|m| !m.is_resolved())
    }
}
