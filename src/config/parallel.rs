//! Parallelism configuration for index building.

use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// Configuration for parallel processing operations.
///
/// When enabled, per-file work runs on a rayon thread pool sized by
/// `max_concurrency` (all cores when unset).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParallelConfig {
    /// Enable parallel processing (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum worker threads (default: available cores)
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_concurrency: None,
        }
    }
}

impl ParallelConfig {
    /// Create a config with parallel processing disabled.
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Number of worker threads actually used
    pub fn effective_concurrency(&self) -> usize {
        if !self.enabled {
            return 1;
        }
        self.max_concurrency.unwrap_or_else(num_cpus)
    }

    /// Dedicated pool for one initialization run.
    ///
    /// Work executed through `install` on the returned pool uses exactly
    /// `effective_concurrency` threads.
    pub fn build_thread_pool(&self) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.effective_concurrency())
            .thread_name(|i| format!("impactmap-worker-{i}"))
            .build()
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_config_default() {
        let config = ParallelConfig::default();
        assert!(config.enabled);
        assert!(config.max_concurrency.is_none());
        assert!(config.effective_concurrency() >= 1);
    }

    #[test]
    fn test_sequential_uses_one_thread() {
        let config = ParallelConfig {
            max_concurrency: Some(8),
            ..ParallelConfig::sequential()
        };
        assert_eq!(config.effective_concurrency(), 1);
        assert_eq!(config.build_thread_pool().unwrap().current_num_threads(), 1);
    }

    #[test]
    fn test_explicit_concurrency() {
        let config = ParallelConfig {
            enabled: true,
            max_concurrency: Some(3),
        };
        assert_eq!(config.build_thread_pool().unwrap().current_num_threads(), 3);
    }
}
