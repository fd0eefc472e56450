use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::ImpactmapConfig;

pub const CONFIG_FILE_NAME: &str = ".impactmap.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Read the raw contents of a config file
pub(crate) fn read_config_file(path: &Path) -> Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse config from a TOML string and reject unusable values
pub fn parse_and_validate_config(contents: &str) -> Result<ImpactmapConfig, String> {
    let config = toml::from_str::<ImpactmapConfig>(contents)
        .map_err(|e| format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))?;

    let indexing = &config.indexing;
    if indexing.table_flush_batch == 0
        || indexing.mapping_flush_batch == 0
        || indexing.call_log_batch == 0
    {
        return Err("indexing batch sizes must be greater than zero".to_string());
    }
    if let Some(0) = config.parallel.max_concurrency {
        return Err("parallel.max_concurrency must be greater than zero".to_string());
    }
    for pattern in indexing
        .mapper_include
        .iter()
        .chain(indexing.mapper_exclude.iter())
    {
        glob::Pattern::new(pattern)
            .map_err(|e| format!("Invalid mapper pattern '{}': {}", pattern, e))?;
    }
    for pattern in &indexing.source_exclude {
        glob::Pattern::new(pattern)
            .map_err(|e| format!("Invalid source pattern '{}': {}", pattern, e))?;
    }

    Ok(config)
}

/// Try loading config from a specific path; `None` when absent or invalid
pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<ImpactmapConfig> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            tracing::debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            tracing::warn!("{}. Using defaults.", e);
            None
        }
    }
}

fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // "not found" is the normal case while walking up
    if error.kind() != std::io::ErrorKind::NotFound {
        tracing::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// `start` followed by its ancestors, at most `max_depth` entries
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Find the nearest `.impactmap.toml` at or above `start`
pub fn load_config_from(start: &Path) -> ImpactmapConfig {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            tracing::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            ImpactmapConfig::default()
        })
}

/// Find the nearest `.impactmap.toml` at or above the working directory
pub fn load_config() -> ImpactmapConfig {
    match std::env::current_dir() {
        Ok(current) => load_config_from(&current),
        Err(e) => {
            tracing::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            ImpactmapConfig::default()
        }
    }
}
