//! Shared error types for impactmap
//!
//! Only a handful of conditions are hard errors. Parse failures and cache
//! trouble are reported through the diagnostic sink and degrade gracefully;
//! they surface as `ImpactError` values only from the leaf functions that
//! produce them, so callers can decide to skip the offending file.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for impactmap operations
#[derive(Debug, Error)]
pub enum ImpactError {
    /// A query was issued before `ImpactAnalyzer::initialize` completed
    #[error("Impact analyzer is not initialized; call initialize() before querying")]
    NotInitialized,

    /// The analysis root does not exist or is not a directory
    #[error("Invalid analysis root: {}", path.display())]
    InvalidRoot { path: PathBuf },

    /// Initialization was cancelled cooperatively
    #[error("Initialization cancelled")]
    Cancelled,

    /// File system errors with path context
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Mapper or source file could not be parsed
    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Cache file could not be read or written
    #[error("Cache error on {}: {message}", path.display())]
    Cache { path: PathBuf, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid inclusion pattern
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

impl ImpactError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error with path context
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a cache error with path context
    pub fn cache(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Cache {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Programming-error class: the caller used the API out of order.
    /// These are never worth retrying.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, ImpactError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_initialized_is_usage_error() {
        assert!(ImpactError::NotInitialized.is_usage_error());
        assert!(!ImpactError::Cancelled.is_usage_error());
    }

    #[test]
    fn test_parse_error_display_includes_path() {
        let err = ImpactError::parse("/tmp/OrderDao.xml", "unexpected end of file");
        let msg = err.to_string();
        assert!(msg.contains("OrderDao.xml"));
        assert!(msg.contains("unexpected end of file"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ImpactError::io("/tmp/x", io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
