use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::is_skipped_dir;
use crate::config::IndexingConfig;
use crate::core::Module;
use crate::errors::Result;

/// Locates mapper documents inside a module.
///
/// A mapper is an `.xml` file under the module's source or resource
/// subtree whose path relative to the module root matches an include glob
/// and no exclude glob.
#[derive(Debug, Clone)]
pub struct MapperLocator {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl MapperLocator {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn from_config(config: &IndexingConfig) -> Result<Self> {
        Self::new(&config.mapper_include, &config.mapper_exclude)
    }

    /// Mapper files of `module`, sorted
    pub fn locate(&self, module: &Module) -> Vec<PathBuf> {
        let mut found = BTreeSet::new();
        for root in module.mapper_roots() {
            for entry in WalkDir::new(root)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(&e.file_name().to_string_lossy()))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let path = entry.path();
                if self.is_mapper(&module.root, path) {
                    found.insert(path.to_path_buf());
                }
            }
        }
        found.into_iter().collect()
    }

    /// Mapper files of every module, sorted and without duplicates
    pub fn locate_all(&self, modules: &[Module]) -> Vec<(String, PathBuf)> {
        let mut seen = BTreeSet::new();
        let mut files = Vec::new();
        for module in modules {
            for path in self.locate(module) {
                if seen.insert(path.clone()) {
                    files.push((module.name.clone(), path));
                }
            }
        }
        files.sort_by(|a, b| a.1.cmp(&b.1));
        files
    }

    pub fn is_mapper(&self, module_root: &Path, path: &Path) -> bool {
        let is_xml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("xml"))
            .unwrap_or(false);
        if !is_xml {
            return false;
        }
        let relative = path.strip_prefix(module_root).unwrap_or(path);
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.include
            .iter()
            .any(|p| p.matches_path_with(relative, options))
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_path_with(relative, options))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(Into::into))
        .collect()
}
