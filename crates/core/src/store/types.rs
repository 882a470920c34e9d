//! Types for the persistent swarm metadata cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during store operations.
///
/// The cache is advisory: callers log these and carry on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persisted per-swarm record, one JSON file per content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmMetadata {
    /// Info hash (lowercase hex). Primary key.
    pub hash: String,
    /// Catalog item this swarm was played for.
    pub catalog_id: i64,
    /// Episode/part number within the catalog item.
    pub episode: u32,
    /// Display name.
    pub name: String,
    /// Total content size in bytes.
    pub size_bytes: u64,
    /// Last known download progress, 0.0 - 1.0.
    pub progress: f64,
    /// Number of files in the swarm.
    pub file_count: u32,
    /// Announce endpoints.
    #[serde(default)]
    pub announce: Vec<String>,
    /// Whether the swarm is marked private.
    #[serde(default)]
    pub private: bool,
    /// When this record was last written.
    pub touched_at: DateTime<Utc>,
}

/// Listing projection of a cached swarm. Derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub catalog_id: i64,
    pub episode: u32,
    pub hash: String,
    pub progress: f64,
    pub size_bytes: u64,
    pub name: String,
    pub file_count: u32,
    pub touched_at: DateTime<Utc>,
}

impl From<&SwarmMetadata> for LibraryEntry {
    fn from(meta: &SwarmMetadata) -> Self {
        Self {
            catalog_id: meta.catalog_id,
            episode: meta.episode,
            hash: meta.hash.clone(),
            progress: meta.progress,
            size_bytes: meta.size_bytes,
            name: meta.name.clone(),
            file_count: meta.file_count,
            touched_at: meta.touched_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> SwarmMetadata {
        SwarmMetadata {
            hash: "abcdef0123456789abcdef0123456789abcdef01".to_string(),
            catalog_id: 42,
            episode: 3,
            name: "Example Show - 03".to_string(),
            size_bytes: 700 * 1024 * 1024,
            progress: 0.25,
            file_count: 1,
            announce: vec!["http://tracker.example/announce".to_string()],
            private: false,
            touched_at: Utc::now(),
        }
    }

    #[test]
    fn test_metadata_round_trips_through_json() {
        let meta = sample_metadata();
        let json = serde_json::to_string(&meta).unwrap();
        let parsed: SwarmMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_metadata_defaults_for_missing_fields() {
        // Records written by older builds may lack announce/private.
        let json = r#"{
            "hash": "abcdef0123456789abcdef0123456789abcdef01",
            "catalog_id": 1,
            "episode": 1,
            "name": "x",
            "size_bytes": 10,
            "progress": 0.0,
            "file_count": 1,
            "touched_at": "2025-01-01T00:00:00Z"
        }"#;
        let parsed: SwarmMetadata = serde_json::from_str(json).unwrap();
        assert!(parsed.announce.is_empty());
        assert!(!parsed.private);
    }

    #[test]
    fn test_library_entry_projection() {
        let meta = sample_metadata();
        let entry = LibraryEntry::from(&meta);
        assert_eq!(entry.hash, meta.hash);
        assert_eq!(entry.catalog_id, meta.catalog_id);
        assert_eq!(entry.episode, meta.episode);
        assert_eq!(entry.size_bytes, meta.size_bytes);
    }
}
