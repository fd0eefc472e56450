use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Environment variable naming a custom cache root
pub const CACHE_DIR_ENV: &str = "IMPACTMAP_CACHE_DIR";

/// Strategy for cache storage location
#[derive(Debug, Clone, PartialEq)]
pub enum CacheStrategy {
    /// Directory given explicitly in config or on the command line, used as is
    Configured(PathBuf),
    /// Root taken from `IMPACTMAP_CACHE_DIR`
    Custom(PathBuf),
    /// Platform cache directory (default)
    Shared,
}

/// Where one analysis root keeps its cache files
#[derive(Debug, Clone)]
pub struct CacheLocation {
    pub strategy: CacheStrategy,
    pub base_path: PathBuf,
    pub project_id: String,
}

impl CacheLocation {
    /// Resolve the cache location for `root` from config and environment
    pub fn resolve(root: &Path, configured: Option<&Path>) -> Result<Self> {
        let env_dir = std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from);
        Self::resolve_with(root, configured, env_dir)
    }

    /// Resolution with the environment passed in
    pub fn resolve_with(
        root: &Path,
        configured: Option<&Path>,
        env_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let project_id = Self::generate_project_id(root);

        let strategy = match (configured, env_dir) {
            (Some(dir), _) => CacheStrategy::Configured(dir.to_path_buf()),
            (None, Some(dir)) if !dir.as_os_str().is_empty() => CacheStrategy::Custom(dir),
            _ => CacheStrategy::Shared,
        };

        let base_path = match &strategy {
            CacheStrategy::Configured(dir) => dir.clone(),
            CacheStrategy::Custom(dir) => dir.join("impactmap").join("projects").join(&project_id),
            CacheStrategy::Shared => Self::get_shared_cache_dir()?
                .join("projects")
                .join(&project_id),
        };

        Ok(Self {
            strategy,
            base_path,
            project_id,
        })
    }

    /// Platform-specific shared cache directory
    fn get_shared_cache_dir() -> Result<PathBuf> {
        if let Ok(xdg_cache) = std::env::var("XDG_CACHE_HOME") {
            if !xdg_cache.is_empty() {
                return Ok(PathBuf::from(xdg_cache).join("impactmap"));
            }
        }
        if let Some(cache_dir) = dirs::cache_dir() {
            return Ok(cache_dir.join("impactmap"));
        }
        Ok(std::env::temp_dir().join("impactmap_cache"))
    }

    /// Stable id of an analysis root: first 16 hex chars of the SHA-256 of
    /// its canonical path
    pub fn generate_project_id(root: &Path) -> String {
        let abs_path = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let mut hasher = Sha256::new();
        hasher.update(abs_path.to_string_lossy().as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        hash[..16].to_string()
    }

    pub fn get_cache_path(&self) -> &Path {
        &self.base_path
    }
}
