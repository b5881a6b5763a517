//! Hooks for observing best-effort cleanup
//!
//! Deletes never fail towards the caller. Besides being logged, failures are
//! handed to a `CleanupReporter`, so metrics and tests can observe them
//! without scraping logs.

use crate::storage_types::StorageBackend;

/// A delete that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub backend: StorageBackend,
    /// The reference or folder the caller asked to delete
    pub target: String,
    pub reason: String,
}

/// Receives best-effort delete failures.
pub trait CleanupReporter: Send + Sync {
    fn report_delete_failure(&self, failure: &DeleteFailure);
}

/// No-op implementation for when nothing observes cleanup failures
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCleanupReporter;

impl CleanupReporter for NoOpCleanupReporter {
    fn report_delete_failure(&self, _failure: &DeleteFailure) {}
}
