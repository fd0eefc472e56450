// Export modules for library usage
pub mod analyzer;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod indexer;
pub mod io;
pub mod observability;
pub mod parsers;
pub mod resolver;
pub mod scanner;

// Re-export commonly used types
pub use crate::core::{
    CallChain, CallReference, CallSiteIndex, ImpactAnalysisResult, IndexStatistics,
    MapperStatement, Module, RepositoryMethodRef, StatementKind, TableImpact, TableIndex,
    TableRepositoryMapping,
};

pub use crate::analyzer::{ChainTracer, ImpactAnalyzer};
pub use crate::config::{ImpactmapConfig, LayerPolicy, NamingConventionPolicy};
pub use crate::errors::{ImpactError, Result};
pub use crate::observability::{CancellationToken, DiagnosticSink, MemorySink, TracingSink};
pub use crate::parsers::{extract_table_names, normalize_table_name};
pub use crate::resolver::{ReceiverResolver, ScopeResolver};

pub use crate::io::output::{create_writer, OutputFormat, OutputWriter};
