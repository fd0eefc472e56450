//! Shared data model
//!
//! Index structures are built once per initialization and are read-only
//! afterwards; query results are created fresh for every query.

pub mod chain;
pub mod index;
pub mod repository;
pub mod types;

pub use chain::{CallChain, ImpactAnalysisResult, IndexStatistics, TableImpact};
pub use index::{CallSiteIndex, TableIndex};
pub use repository::{RepositoryMethodRef, TableRepositoryMapping, UNRESOLVED_PREFIX};
pub use types::{
    simple_type_name, split_method_identifier, CallReference, MapperStatement, Module,
    StatementKind,
};
