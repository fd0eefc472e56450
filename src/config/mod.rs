//! Configuration loaded from `.impactmap.toml`.
//!
//! Every section and field has a default, so a partial file (or none at all)
//! is always usable. CLI flags are applied on top by the binary.

mod core;
pub mod layers;
mod loader;
mod parallel;

pub use self::core::{AnalysisConfig, CacheConfig, ImpactmapConfig, IndexingConfig, ResolutionConfig};
pub use layers::{LayerPolicy, LayersConfig, NamingConventionPolicy, SharedLayerPolicy};
pub use loader::{
    directory_ancestors, load_config, load_config_from, parse_and_validate_config,
    CONFIG_FILE_NAME,
};
pub use parallel::ParallelConfig;
