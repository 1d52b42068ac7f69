use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::model::{AddressKey, Coordinate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheLookup {
    Absent,
    Resolved(Coordinate),
    Unresolvable,
}

/// Write-once, process-lifetime map from address keys to lookup outcomes.
///
/// Clones share the same entries. A key keeps whatever was stored first.
#[derive(Clone, Default)]
pub struct AddressCache {
    entries: Arc<Mutex<HashMap<AddressKey, Option<Coordinate>>>>,
}

impl AddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &AddressKey) -> CacheLookup {
        match self.entries.lock().get(key) {
            None => CacheLookup::Absent,
            Some(Some(coordinate)) => CacheLookup::Resolved(*coordinate),
            Some(None) => CacheLookup::Unresolvable,
        }
    }

    /// Returns `false` without touching the entry when the key was already stored.
    pub fn store(&self, key: AddressKey, value: Option<Coordinate>) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            debug!(key = %key, "ignoring second write to address cache entry");
            return false;
        }
        entries.insert(key, value);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn unresolvable_count(&self) -> usize {
        self.entries.lock().values().filter(|v| v.is_none()).count()
    }
}
