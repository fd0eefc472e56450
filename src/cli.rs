use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ImpactmapConfig;

#[derive(Parser, Debug)]
#[command(name = "impactmap")]
#[command(about = "Trace database tables to the service methods that reach them", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report every call chain reaching the given tables
    Analyze {
        /// Root directory of the monolith
        root: PathBuf,

        /// Table names (case-insensitive, schema prefix allowed)
        #[arg(required = true)]
        tables: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        index: IndexArgs,
    },

    /// Show index statistics
    Stats {
        root: PathBuf,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        index: IndexArgs,
    },

    /// List every indexed table
    Tables {
        root: PathBuf,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        index: IndexArgs,
    },

    /// Delete the cached indices of a root
    ClearCache {
        root: PathBuf,

        /// Cache directory (overrides config and IMPACTMAP_CACHE_DIR)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

/// Flags shared by every command that builds the indices
#[derive(Args, Debug, Clone, Default)]
pub struct IndexArgs {
    /// Cache directory (overrides config and IMPACTMAP_CACHE_DIR)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Build everything in memory, ignoring and not writing caches
    #[arg(long)]
    pub no_cache: bool,

    /// Worker threads (0 = all cores)
    #[arg(short, long, env = "IMPACTMAP_JOBS")]
    pub jobs: Option<usize>,

    /// Stop after this many chains per repository method
    #[arg(long)]
    pub max_chains: Option<usize>,

    /// Skip Java sources whose path matches this glob (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,
}

impl IndexArgs {
    /// Overlay the flags on a loaded configuration
    pub fn apply(&self, config: &mut ImpactmapConfig) {
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = Some(dir.clone());
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        match self.jobs {
            Some(0) => config.parallel.max_concurrency = None,
            Some(1) => config.parallel.enabled = false,
            Some(jobs) => config.parallel.max_concurrency = Some(jobs),
            None => {}
        }
        if self.max_chains.is_some() {
            config.analysis.max_chains_per_method = self.max_chains;
        }
        config
            .indexing
            .source_exclude
            .extend(self.exclude.iter().cloned());
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

impl From<OutputFormat> for crate::io::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => crate::io::OutputFormat::Json,
            OutputFormat::Text => crate::io::OutputFormat::Text,
        }
    }
}
