//! JSON persistence for the date-keyed record store.
//!
//! The durable format is a single pretty-printed JSON object of string pairs
//! with keys in descending order, which for `YYYY-MM-DD[-N]` keys is
//! reverse-chronological. serde_json leaves non-ASCII text unescaped, so the
//! Korean captions round-trip byte-for-byte.
//!
//! Loading is lenient by design: a missing or unparseable file is an empty
//! store, and the caller decides whether that is worth aborting over. The
//! migration path uses [`load_strict`] precisely because it rewrites the file
//! in place.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{info, warn};
use wodarc_core::RecordStore;

/// Serialization wrapper that writes the map keys in descending order.
struct Descending<'a>(&'a RecordStore);

impl Serialize for Descending<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0.iter().rev() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Load the record store, treating any failure as an empty store.
pub fn load(path: &Path) -> RecordStore {
    match load_strict(path) {
        Ok(store) => store,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "store.load_failed");
            RecordStore::new()
        }
    }
}

/// Load the record store, propagating missing-file and parse errors.
pub fn load_strict(path: &Path) -> anyhow::Result<RecordStore> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read store: {}", path.display()))?;
    let store: RecordStore = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse store: {}", path.display()))?;
    Ok(store)
}

/// Write the record store, creating any missing parent directories.
pub fn save(path: &Path, store: &RecordStore) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let body = serde_json::to_string_pretty(&Descending(store))?;
    fs::write(path, body).with_context(|| format!("failed to write store: {}", path.display()))?;
    info!(path = %path.display(), entries = store.len(), "store.save");
    Ok(())
}

/// Copy the store file to `<path>.bak` before a destructive rewrite.
pub fn backup(path: &Path) -> anyhow::Result<PathBuf> {
    let mut backup_path = path.as_os_str().to_owned();
    backup_path.push(".bak");
    let backup_path = PathBuf::from(backup_path);
    fs::copy(path, &backup_path)
        .with_context(|| format!("failed to back up store: {}", path.display()))?;
    info!(path = %backup_path.display(), "store.backup");
    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descending_wrapper_orders_keys() {
        let store: RecordStore = [
            ("2023-01-02".to_string(), "Fran".to_string()),
            ("2026-02-06".to_string(), "For time".to_string()),
            ("2026-02-06-2".to_string(), "Second".to_string()),
        ]
        .into_iter()
        .collect();
        let body = serde_json::to_string(&Descending(&store)).unwrap();
        let first = body.find("2026-02-06-2").unwrap();
        let second = body.find("\"2026-02-06\"").unwrap();
        let third = body.find("2023-01-02").unwrap();
        assert!(first < second && second < third);
    }
}
