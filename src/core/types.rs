//! Common type definitions used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A build module of the monolith (a directory carrying its own build file).
///
/// Identity is `(name, root)`; the subtree paths are derived data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub root: PathBuf,
    pub source_dir: Option<PathBuf>,
    pub resource_dir: Option<PathBuf>,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        source_dir: Option<PathBuf>,
        resource_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            source_dir,
            resource_dir,
        }
    }

    /// Directories searched for Java sources: the source subtree when the
    /// module has one, otherwise the whole module root.
    pub fn source_roots(&self) -> Vec<&Path> {
        match &self.source_dir {
            Some(dir) => vec![dir.as_path()],
            None => vec![self.root.as_path()],
        }
    }

    /// Directories searched for mapper files.
    pub fn mapper_roots(&self) -> Vec<&Path> {
        let mut roots: Vec<&Path> = self.source_roots();
        if let Some(resources) = &self.resource_dir {
            if !roots.iter().any(|r| resources.starts_with(r)) {
                roots.push(resources.as_path());
            }
        }
        roots
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.root == other.root
    }
}

impl Eq for Module {}

impl std::hash::Hash for Module {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.root.hash(state);
    }
}

/// Kind of a declared mapper statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    /// All kinds, in the order the parser visits them
    pub const ALL: [StatementKind; 4] = [
        StatementKind::Select,
        StatementKind::Insert,
        StatementKind::Update,
        StatementKind::Delete,
    ];

    /// Element name used in mapper documents
    pub fn tag(&self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One declared data operation in a mapper file.
///
/// Identity is `(namespace, id, mapper_path)`. The raw text keeps dynamic
/// placeholders and is only ever used for table extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapperStatement {
    pub module: String,
    pub mapper_path: PathBuf,
    pub namespace: String,
    pub id: String,
    pub kind: StatementKind,
    pub raw_sql: String,
}

impl MapperStatement {
    pub fn fully_qualified_id(&self) -> String {
        format!("{}.{}", self.namespace, self.id)
    }

    /// File stem of the mapper file, the presumed repository class name
    pub fn mapper_stem(&self) -> Option<&str> {
        self.mapper_path.file_stem().and_then(|s| s.to_str())
    }
}

impl PartialEq for MapperStatement {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.id == other.id
            && self.mapper_path == other.mapper_path
    }
}

impl Eq for MapperStatement {}

impl std::hash::Hash for MapperStatement {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.id.hash(state);
        self.mapper_path.hash(state);
    }
}

/// A single call site: who calls, from where.
///
/// Ordered by file, then line, then caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallReference {
    pub file: PathBuf,
    pub line: usize,
    /// Fully qualified `Type.method` of the calling method
    pub caller: String,
}

impl CallReference {
    pub fn new(caller: impl Into<String>, file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            caller: caller.into(),
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for CallReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.caller)
    }
}

/// Split `a.b.Type.method` into (`a.b.Type`, `method`).
pub fn split_method_identifier(identifier: &str) -> Option<(&str, &str)> {
    identifier
        .rfind('.')
        .map(|idx| (&identifier[..idx], &identifier[idx + 1..]))
}

/// Last dotted segment of a type name
pub fn simple_type_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}
