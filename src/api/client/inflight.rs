//! Observational registry of logical requests currently in flight.
//!
//! Entries are keyed by `METHOD:url` and reference-counted. The registry never
//! merges or short-circuits requests; it only reports what is running.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub(crate) struct InFlightRegistry {
    entries: Mutex<HashMap<String, usize>>,
}

impl InFlightRegistry {
    /// Register a logical request until the returned guard drops.
    pub(crate) fn enter(&self, key: String) -> InFlightGuard<'_> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let count = entries.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            tracing::debug!(%key, concurrent = *count, "identical request already in flight");
        }
        InFlightGuard {
            registry: self,
            key,
        }
    }

    pub(crate) fn count(&self, key: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    fn leave(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = entries.get_mut(key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                entries.remove(key);
            }
        }
    }
}

/// Removes its registry entry on drop, whatever the outcome.
pub(crate) struct InFlightGuard<'a> {
    registry: &'a InFlightRegistry,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.leave(&self.key);
    }
}
