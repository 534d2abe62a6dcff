//! Shared snapshot of the current discovery targets.
//!
//! The cache holds an immutable `Arc<[Target]>`. Writers build the new list
//! outside the lock and swap the handle; readers clone the handle. The lock
//! is held only for the swap or the clone, so a reader sees either the
//! previous complete list or the new one.

use dns_exporter_core::Target;
use parking_lot::Mutex;
use std::sync::Arc;

/// Cache of the most recent refresh cycle's targets
#[derive(Debug, Clone)]
pub struct TargetCache {
    inner: Arc<Mutex<Arc<[Target]>>>,
}

impl Default for TargetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Arc::from(Vec::new()))),
        }
    }

    /// Replace the whole snapshot
    pub fn replace(&self, targets: Vec<Target>) {
        let next: Arc<[Target]> = Arc::from(targets);
        let previous = std::mem::replace(&mut *self.inner.lock(), next);
        // Free the old list after the lock is released.
        drop(previous);
    }

    /// Current snapshot; stays valid and unchanged after later replacements
    #[must_use]
    pub fn snapshot(&self) -> Arc<[Target]> {
        Arc::clone(&self.inner.lock())
    }

    /// Number of targets in the current snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the current snapshot is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
