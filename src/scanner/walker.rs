use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::is_skipped_dir;
use crate::core::Module;

/// Collects `.java` files below a root, minus ignore globs.
pub struct SourceWalker {
    root: PathBuf,
    ignore_patterns: Vec<glob::Pattern>,
}

impl SourceWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ignore_patterns: vec![],
        }
    }

    /// Invalid patterns are dropped with a warning
    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Self {
        self.ignore_patterns = patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("Ignoring invalid pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();
        self
    }

    pub fn walk(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(&e.file_name().to_string_lossy()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.should_process(e.path()))
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }

    fn should_process(&self, path: &Path) -> bool {
        if path.extension().and_then(|e| e.to_str()) != Some("java") {
            return false;
        }
        let path_str = path.to_string_lossy();
        !self
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.matches(&path_str))
    }
}

/// Every Java source file of every module not matched by `exclude`,
/// sorted, each listed once
pub fn find_java_sources(modules: &[Module], exclude: &[String]) -> Vec<PathBuf> {
    let mut files = BTreeSet::new();
    for module in modules {
        for root in module.source_roots() {
            files.extend(
                SourceWalker::new(root.to_path_buf())
                    .with_ignore_patterns(exclude)
                    .walk(),
            );
        }
    }
    files.into_iter().collect()
}
