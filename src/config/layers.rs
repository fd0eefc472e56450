//! Layer classification by type naming convention.
//!
//! The business-layer predicate decides where a call chain stops; the
//! repository predicate is informational only.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::simple_type_name;

/// Decides which architectural layer a type belongs to.
pub trait LayerPolicy: Send + Sync {
    fn is_business_layer(&self, type_name: &str) -> bool;

    fn is_repository(&self, type_name: &str) -> bool;
}

pub type SharedLayerPolicy = Arc<dyn LayerPolicy>;

/// `[layers]` section of `.impactmap.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayersConfig {
    #[serde(default = "default_business_contains")]
    pub business_contains: Vec<String>,

    #[serde(default = "default_business_suffixes")]
    pub business_suffixes: Vec<String>,

    #[serde(default = "default_repository_contains")]
    pub repository_contains: Vec<String>,

    #[serde(default = "default_repository_suffixes")]
    pub repository_suffixes: Vec<String>,
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            business_contains: default_business_contains(),
            business_suffixes: default_business_suffixes(),
            repository_contains: default_repository_contains(),
            repository_suffixes: default_repository_suffixes(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_business_contains() -> Vec<String> {
    strings(&["Service", "Facade", "Manager"])
}

fn default_business_suffixes() -> Vec<String> {
    strings(&["BL", "Logic"])
}

fn default_repository_contains() -> Vec<String> {
    strings(&["DbCmd", "Repository"])
}

fn default_repository_suffixes() -> Vec<String> {
    strings(&["Cmd", "DAO", "Dao"])
}

/// Substring and suffix matching on the simple type name.
#[derive(Debug, Clone, Default)]
pub struct NamingConventionPolicy {
    config: LayersConfig,
}

impl NamingConventionPolicy {
    pub fn new(config: LayersConfig) -> Self {
        Self { config }
    }

    pub fn shared(config: LayersConfig) -> SharedLayerPolicy {
        Arc::new(Self::new(config))
    }

    fn matches(name: &str, contains: &[String], suffixes: &[String]) -> bool {
        let simple = simple_type_name(name);
        contains.iter().any(|c| simple.contains(c.as_str()))
            || suffixes.iter().any(|s| simple.ends_with(s.as_str()))
    }
}

impl LayerPolicy for NamingConventionPolicy {
    fn is_business_layer(&self, type_name: &str) -> bool {
        Self::matches(
            type_name,
            &self.config.business_contains,
            &self.config.business_suffixes,
        )
    }

    fn is_repository(&self, type_name: &str) -> bool {
        Self::matches(
            type_name,
            &self.config.repository_contains,
            &self.config.repository_suffixes,
        )
    }
}
