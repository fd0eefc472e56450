use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::is_skipped_dir;
use crate::core::Module;
use crate::errors::{ImpactError, Result};

const BUILD_FILE: &str = "pom.xml";

/// Every directory under `root` holding a build file, as a module.
///
/// The root's own build file is treated as an aggregator and dropped when
/// child modules exist. Without any build file the root is one implicit
/// module.
pub fn discover_modules(root: &Path) -> Result<Vec<Module>> {
    if !root.is_dir() {
        return Err(ImpactError::InvalidRoot {
            path: root.to_path_buf(),
        });
    }

    let mut module_dirs: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !is_skipped_dir(&entry.file_name().to_string_lossy())
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir() && entry.path().join(BUILD_FILE).is_file())
        .map(|entry| entry.into_path())
        .collect();
    module_dirs.sort();

    let has_children = module_dirs.iter().any(|dir| dir != root);
    if has_children {
        module_dirs.retain(|dir| dir != root);
    } else if module_dirs.is_empty() {
        tracing::debug!(
            "No {} under {}, using the root as one module",
            BUILD_FILE,
            root.display()
        );
        module_dirs.push(root.to_path_buf());
    }

    Ok(module_dirs.iter().map(|dir| module_at(dir)).collect())
}

fn module_at(dir: &Path) -> Module {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    Module::new(
        name,
        dir,
        first_existing(dir, &["src/main/java", "src"]),
        first_existing(dir, &["src/main/resources", "src/resources"]),
    )
}

fn first_existing(dir: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_dir())
}
