//! Persistent swarm metadata cache.
//!
//! One JSON file per content hash under a cache directory. The cache is
//! advisory: the engine is authoritative for anything actively joined,
//! so corrupt or missing records read as "not found" and never fail a
//! caller.

mod types;

pub use types::*;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::warn;

/// File-backed store of `SwarmMetadata` records.
///
/// All file I/O for one store instance is serialized behind a single
/// reader/writer lock: reads share, writes exclude.
pub struct MetadataStore {
    cache_dir: PathBuf,
    lock: RwLock<()>,
}

impl MetadataStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let cache_dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            lock: RwLock::new(()),
        })
    }

    /// Directory this store writes into.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn record_path(&self, hash: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", hash))
    }

    /// Fetch a record. Missing or unreadable records are `None`.
    pub fn get(&self, hash: &str) -> Option<SwarmMetadata> {
        if hash.is_empty() {
            return None;
        }
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());

        let data = fs::read(self.record_path(hash)).ok()?;
        match serde_json::from_slice(&data) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(hash = %hash, error = %e, "Skipping corrupt cache record");
                None
            }
        }
    }

    /// Write a record, replacing any previous one for the same hash.
    pub fn set(&self, meta: &SwarmMetadata) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());

        let data = serde_json::to_vec(meta)?;
        fs::write(self.record_path(&meta.hash), data)?;
        Ok(())
    }

    /// Delete a record. Deleting an absent record is not an error.
    pub fn delete(&self, hash: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());

        match fs::remove_file(self.record_path(hash)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// All cached hashes.
    pub fn list(&self) -> Vec<String> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());

        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };

        entries
            .flatten()
            .filter(|e| e.path().is_file())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix(".json"))
                    .map(|hash| hash.to_string())
            })
            .collect()
    }

    /// All readable records. Corrupt entries are skipped, not fatal.
    pub fn entries(&self) -> Vec<SwarmMetadata> {
        self.list()
            .iter()
            .filter_map(|hash| self.get(hash))
            .collect()
    }

    /// Listing projection over every cached swarm.
    pub fn library(&self) -> Vec<LibraryEntry> {
        self.entries().iter().map(LibraryEntry::from).collect()
    }

    /// Cached entries for one catalog item.
    pub fn entries_for_catalog(&self, catalog_id: i64) -> Vec<LibraryEntry> {
        self.entries()
            .iter()
            .filter(|m| m.catalog_id == catalog_id)
            .map(LibraryEntry::from)
            .collect()
    }

    /// Entry count and total content bytes across the cache.
    pub fn cache_stats(&self) -> (usize, u64) {
        let entries = self.entries();
        let total = entries.iter().map(|m| m.size_bytes).sum();
        (entries.len(), total)
    }
}
