//! Cooperative cancellation for long-running index builds.

use crate::errors::{ImpactError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag checked between files and merge steps.
///
/// All clones observe the same state; cancelling is irreversible.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(ImpactError::Cancelled)` once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ImpactError::Cancelled)
        } else {
            Ok(())
        }
    }
}
