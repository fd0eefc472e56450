//! Filesystem discovery: build modules, mapper files and Java sources.

pub mod mapper_locator;
pub mod modules;
pub mod walker;

pub use mapper_locator::MapperLocator;
pub use modules::discover_modules;
pub use walker::{find_java_sources, SourceWalker};

/// Directory names never descended into
pub(crate) fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || matches!(name, "target" | "build" | "node_modules" | "out")
}
