use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::layers::LayersConfig;
use super::parallel::ParallelConfig;

/// Root configuration structure for impactmap
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImpactmapConfig {
    /// On-disk cache behaviour
    #[serde(default)]
    pub cache: CacheConfig,

    /// Index building knobs
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Naming conventions for layer detection
    #[serde(default)]
    pub layers: LayersConfig,

    /// Call-site resolution settings
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Parallel processing
    #[serde(default)]
    pub parallel: ParallelConfig,

    /// Query-time settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl ImpactmapConfig {
    /// Configuration with persistence switched off
    pub fn in_memory() -> Self {
        Self {
            cache: CacheConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Persist indices between runs (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Explicit cache directory, overriding env var and shared location
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Reuse a cache only when its content fingerprint matches (default: true)
    #[serde(default = "default_true")]
    pub verify_fingerprint: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            verify_fingerprint: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexingConfig {
    /// Flush the table index every time this many new tables appear
    #[serde(default = "default_table_flush_batch")]
    pub table_flush_batch: usize,

    /// Flush the repository mapping every this many tables
    #[serde(default = "default_mapping_flush_batch")]
    pub mapping_flush_batch: usize,

    /// Call sites appended to the log per write
    #[serde(default = "default_call_log_batch")]
    pub call_log_batch: usize,

    /// Globs a mapper file must match (relative to a module root)
    #[serde(default = "default_mapper_include")]
    pub mapper_include: Vec<String>,

    /// Globs excluding otherwise included mapper files
    #[serde(default = "default_mapper_exclude")]
    pub mapper_exclude: Vec<String>,

    /// Globs matched against the full path of Java sources to skip
    #[serde(default)]
    pub source_exclude: Vec<String>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            table_flush_batch: default_table_flush_batch(),
            mapping_flush_batch: default_mapping_flush_batch(),
            call_log_batch: default_call_log_batch(),
            mapper_include: default_mapper_include(),
            mapper_exclude: default_mapper_exclude(),
            source_exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionConfig {
    /// Method names never recorded as callees
    #[serde(default = "default_method_stoplist")]
    pub method_stoplist: Vec<String>,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            method_stoplist: default_method_stoplist(),
        }
    }
}

impl ResolutionConfig {
    pub fn is_ignored_method(&self, name: &str) -> bool {
        self.method_stoplist.iter().any(|m| m == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AnalysisConfig {
    /// Stop emitting chains for one repository method after this many
    #[serde(default)]
    pub max_chains_per_method: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_table_flush_batch() -> usize {
    1000
}

fn default_mapping_flush_batch() -> usize {
    1000
}

fn default_call_log_batch() -> usize {
    500
}

fn default_mapper_include() -> Vec<String> {
    vec!["**/*.xml".to_string()]
}

fn default_mapper_exclude() -> Vec<String> {
    ["**/META-INF/**", "**/WEB-INF/**", "**/pom.xml"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_method_stoplist() -> Vec<String> {
    [
        "toString",
        "equals",
        "hashCode",
        "wait",
        "notify",
        "notifyAll",
        "getClass",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
