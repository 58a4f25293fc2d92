//! Fingerprint registry
//!
//! Maps sensor slot IDs to human names, persisted as a small JSON object
//! (slot keys stringified, as JSON requires). Mutated only by the protocol
//! engine's successful enroll/delete outcomes; read by identification match
//! reporting and the listing API. Write failures are logged but never fail
//! the device operation that already succeeded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{error, info, warn};

use fplock_types::FingerprintRecord;

pub struct Registry {
    path: PathBuf,
    entries: RwLock<BTreeMap<u16, String>>,
}

impl Registry {
    /// Load the registry from disk; a missing or corrupt file starts empty
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read_file(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "registry file missing or unreadable, starting empty"
                );
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    fn read_file(path: &Path) -> anyhow::Result<BTreeMap<u16, String>> {
        let text = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&text)?;

        let mut entries = BTreeMap::new();
        for (key, name) in raw {
            let slot: u16 = key.parse()?;
            entries.insert(slot, name);
        }
        Ok(entries)
    }

    fn save(&self, entries: &BTreeMap<u16, String>) {
        let raw: BTreeMap<String, String> = entries
            .iter()
            .map(|(slot, name)| (slot.to_string(), name.clone()))
            .collect();

        match serde_json::to_string(&raw) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    error!(path = %self.path.display(), error = %e, "failed to save registry");
                }
            }
            Err(e) => error!(error = %e, "failed to serialize registry"),
        }
    }

    /// Name for a slot, if enrolled
    pub fn get(&self, slot: u16) -> Option<String> {
        self.entries.read().get(&slot).cloned()
    }

    /// Record a successful enrollment; an existing entry is overwritten
    pub fn insert(&self, slot: u16, name: impl Into<String>) {
        let name = name.into();
        let mut entries = self.entries.write();

        if entries.contains_key(&slot) {
            warn!(slot, "slot already registered, updating name");
        }

        entries.insert(slot, name.clone());
        self.save(&entries);
        info!(slot, name, "registry entry added");
    }

    /// Remove a slot after a successful deletion; returns the old name
    pub fn remove(&self, slot: u16) -> Option<String> {
        let mut entries = self.entries.write();
        let removed = entries.remove(&slot);

        if removed.is_some() {
            self.save(&entries);
            info!(slot, "registry entry removed");
        }

        removed
    }

    /// All records, ordered by slot
    pub fn all(&self) -> Vec<FingerprintRecord> {
        self.entries
            .read()
            .iter()
            .map(|(slot, name)| FingerprintRecord::new(*slot, name.clone()))
            .collect()
    }

    /// Listing shape for the API: {"slot": "name"}
    pub fn as_map(&self) -> BTreeMap<String, String> {
        self.entries
            .read()
            .iter()
            .map(|(slot, name)| (slot.to_string(), name.clone()))
            .collect()
    }

    /// Lowest unoccupied slot below `capacity`, if any
    pub fn next_free_slot(&self, capacity: u16) -> Option<u16> {
        let entries = self.entries.read();
        (0..capacity).find(|slot| !entries.contains_key(slot))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "fplock-registry-test-{}-{}.json",
            std::process::id(),
            n
        ))
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let registry = Registry::load(temp_path());
        assert!(registry.is_empty());
        assert_eq!(registry.next_free_slot(100), Some(0));
    }

    #[test]
    fn test_insert_persists_and_reloads() {
        let path = temp_path();

        let registry = Registry::load(&path);
        registry.insert(0, "alice");
        registry.insert(3, "bob");

        let reloaded = Registry::load(&path);
        assert_eq!(reloaded.get(0).as_deref(), Some("alice"));
        assert_eq!(reloaded.get(3).as_deref(), Some("bob"));
        assert_eq!(reloaded.len(), 2);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_next_free_slot_fills_gaps() {
        let registry = Registry::load(temp_path());
        registry.insert(0, "a");
        registry.insert(1, "b");
        registry.insert(3, "c");

        assert_eq!(registry.next_free_slot(100), Some(2));
    }

    #[test]
    fn test_next_free_slot_exhausted() {
        let registry = Registry::load(temp_path());
        registry.insert(0, "a");
        registry.insert(1, "b");

        assert_eq!(registry.next_free_slot(2), None);
    }

    #[test]
    fn test_remove() {
        let path = temp_path();
        let registry = Registry::load(&path);
        registry.insert(5, "carol");

        assert_eq!(registry.remove(5).as_deref(), Some("carol"));
        assert_eq!(registry.remove(5), None);
        assert!(registry.is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let path = temp_path();
        std::fs::write(&path, "not json at all").unwrap();

        let registry = Registry::load(&path);
        assert!(registry.is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_listing_shape() {
        let registry = Registry::load(temp_path());
        registry.insert(2, "dave");

        let map = registry.as_map();
        assert_eq!(map.get("2").map(String::as_str), Some("dave"));

        let all = registry.all();
        assert_eq!(all, vec![FingerprintRecord::new(2, "dave")]);
    }
}
