use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::errors::{AppResult, GeocodeError};
use crate::model::AddressKey;

#[derive(Debug, Clone, Serialize)]
pub struct GeocodeDiagnostic {
    pub timestamp: DateTime<Utc>,
    pub generation: u64,
    pub property_id: String,
    pub address_key: AddressKey,
    pub kind: &'static str,
    pub message: String,
}

/// Bounded buffer of per-address lookup failures for operators.
///
/// Oldest entries drop first once `capacity` is reached.
#[derive(Clone)]
pub struct Diagnostics {
    buffer: Arc<Mutex<VecDeque<GeocodeDiagnostic>>>,
    capacity: usize,
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn record_failure(
        &self,
        generation: u64,
        property_id: &str,
        address_key: &AddressKey,
        error: &GeocodeError,
    ) {
        let entry = GeocodeDiagnostic {
            timestamp: Utc::now(),
            generation,
            property_id: property_id.to_string(),
            address_key: address_key.clone(),
            kind: error.kind(),
            message: error.to_string(),
        };
        let mut buffer = self.buffer.lock();
        while buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry);
    }

    pub fn recent(&self) -> Vec<GeocodeDiagnostic> {
        self.buffer.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Appends buffered entries to `path` as JSON lines and clears the buffer.
    ///
    /// On a write error the buffer is left intact.
    pub fn flush_to(&self, path: &Path) -> AppResult<usize> {
        let mut buffer = self.buffer.lock();
        if buffer.is_empty() {
            return Ok(0);
        }

        let mut encoded = Vec::with_capacity(buffer.len());
        for entry in buffer.iter() {
            encoded.push(serde_json::to_vec(entry)?);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        for line in &encoded {
            file.write_all(line)?;
            file.write_all(b"\n")?;
        }
        file.flush()?;

        let written = buffer.len();
        buffer.clear();
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(address: &str) -> AddressKey {
        AddressKey::new(address, "Springfield", "IL", "62701")
    }

    #[test]
    fn keeps_only_most_recent_entries() {
        let diagnostics = Diagnostics::new(2);
        diagnostics.record_failure(1, "a", &key("1 A St"), &GeocodeError::NotFound);
        diagnostics.record_failure(1, "b", &key("2 B St"), &GeocodeError::transient("timeout"));
        diagnostics.record_failure(2, "c", &key("3 C St"), &GeocodeError::NotFound);

        let recent = diagnostics.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].property_id, "b");
        assert_eq!(recent[0].kind, "transient");
        assert_eq!(recent[1].property_id, "c");
        assert_eq!(recent[1].generation, 2);
    }

    #[test]
    fn flushes_json_lines_and_clears() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("geocode-diagnostics.jsonl");
        let diagnostics = Diagnostics::new(10);
        diagnostics.record_failure(3, "p9", &key("9 Nowhere Rd"), &GeocodeError::NotFound);

        assert_eq!(diagnostics.flush_to(&path).unwrap(), 1);
        assert!(diagnostics.is_empty());
        assert_eq!(diagnostics.flush_to(&path).unwrap(), 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("9 Nowhere Rd, Springfield, IL 62701"));
        assert!(contents.contains("\"not_found\""));
    }
}
