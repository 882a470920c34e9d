//! Types for the transfer engine boundary.

use std::path::PathBuf;

use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during transfer engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to join swarm: {0}")]
    JoinFailed(String),

    #[error("Swarm not found: {0}")]
    SwarmNotFound(String),

    #[error("File not found in swarm: {0}")]
    FileNotFound(String),

    #[error("Unable to resolve identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Timed out waiting for swarm metadata")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(String),
}

/// A user-supplied swarm identifier, classified.
///
/// Mirrors the identifier kinds a play request can carry: a bare
/// 40-char hex info hash, a magnet link, an http(s) link to a .torrent
/// file, or a local .torrent path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwarmSource {
    Hash(String),
    Magnet(String),
    TorrentUrl(String),
    TorrentFile(PathBuf),
}

impl SwarmSource {
    /// Classify a raw identifier string.
    pub fn parse(identifier: &str) -> Result<Self, EngineError> {
        let id = identifier.trim();
        if id.is_empty() {
            return Err(EngineError::InvalidIdentifier(
                "empty identifier".to_string(),
            ));
        }

        if id.len() == 40 && id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(SwarmSource::Hash(id.to_lowercase()));
        }

        if id.starts_with("magnet:") {
            return Ok(SwarmSource::Magnet(id.to_string()));
        }

        if id.starts_with("http://") || id.starts_with("https://") {
            return Ok(SwarmSource::TorrentUrl(id.to_string()));
        }

        Ok(SwarmSource::TorrentFile(PathBuf::from(id)))
    }

    /// The info hash, when it can be determined without contacting the
    /// engine (bare hashes and magnets carrying a btih). Lowercase hex.
    pub fn info_hash(&self) -> Option<String> {
        match self {
            SwarmSource::Hash(h) => Some(h.clone()),
            SwarmSource::Magnet(uri) => {
                let re = Regex::new(r"xt=urn:btih:([0-9a-fA-F]{40})").ok()?;
                re.captures(uri)
                    .map(|c| c[1].to_lowercase())
            }
            _ => None,
        }
    }

    /// Tracker endpoints carried by a magnet's `tr=` params.
    pub fn trackers(&self) -> Vec<String> {
        let SwarmSource::Magnet(uri) = self else {
            return Vec::new();
        };
        let Some((_, query)) = uri.split_once('?') else {
            return Vec::new();
        };
        query
            .split('&')
            .filter_map(|kv| kv.strip_prefix("tr="))
            .filter_map(|v| urlencoding::decode(v).ok())
            .map(|v| v.into_owned())
            .collect()
    }
}

/// Swarm-level facts available once the engine has its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedSwarm {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Total content size in bytes.
    pub size_bytes: u64,
    /// Number of files.
    pub file_count: u32,
    /// Whether the swarm is marked private (no DHT/PEX).
    pub private: bool,
    /// Announce endpoints known at join time.
    pub trackers: Vec<String>,
}

/// A file within a joined swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmFile {
    /// Position within the swarm's file list.
    pub index: usize,
    /// Display path, unique within the swarm.
    pub display_path: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// Cumulative transfer counters for a swarm. Monotonic.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TransferCounters {
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// A connected peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Remote address, when the engine exposes it.
    pub addr: Option<String>,
    /// Whether the peer advertises at least one piece we could fetch.
    pub has_pieces: bool,
}

/// Piece geometry for a swarm.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PieceInfo {
    pub count: u32,
    pub length: u32,
}

/// The opaque transfer engine boundary.
///
/// Everything below this trait (peer discovery, piece selection, the
/// wire protocol) belongs to the backend. Callers get piece-prioritized
/// range reads, cumulative counters and peer enumeration, nothing more.
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Join a swarm and block until its basic metadata (file list,
    /// sizes) is available.
    async fn join(&self, source: &SwarmSource) -> Result<JoinedSwarm, EngineError>;

    /// File list of a joined swarm.
    async fn files(&self, hash: &str) -> Result<Vec<SwarmFile>, EngineError>;

    /// Cumulative bytes read/written for a joined swarm.
    async fn counters(&self, hash: &str) -> Result<TransferCounters, EngineError>;

    /// Currently connected peers.
    async fn peers(&self, hash: &str) -> Result<Vec<PeerInfo>, EngineError>;

    /// Piece count and length.
    async fn piece_info(&self, hash: &str) -> Result<PieceInfo, EngineError>;

    /// Read `[start, end)` of one file, prioritizing the backing pieces
    /// so playback can run ahead of the bulk transfer.
    async fn read_range(
        &self,
        hash: &str,
        file_index: usize,
        start: u64,
        end: u64,
    ) -> Result<Vec<u8>, EngineError>;

    /// Mark the whole swarm for download.
    async fn download_all(&self, hash: &str) -> Result<(), EngineError>;

    /// Release a swarm, optionally deleting its on-disk data.
    async fn release(&self, hash: &str, delete_files: bool) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_hash() {
        let hash = "ABCDEF0123456789ABCDEF0123456789ABCDEF01";
        let source = SwarmSource::parse(hash).unwrap();
        assert_eq!(
            source,
            SwarmSource::Hash(hash.to_lowercase())
        );
        assert_eq!(source.info_hash().unwrap(), hash.to_lowercase());
    }

    #[test]
    fn test_parse_magnet_extracts_btih() {
        let uri = "magnet:?xt=urn:btih:abcdef0123456789abcdef0123456789abcdef01&dn=show";
        let source = SwarmSource::parse(uri).unwrap();
        assert!(matches!(source, SwarmSource::Magnet(_)));
        assert_eq!(
            source.info_hash().unwrap(),
            "abcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn test_parse_magnet_trackers() {
        let uri = "magnet:?xt=urn:btih:abcdef0123456789abcdef0123456789abcdef01\
                   &tr=http%3A%2F%2Ftracker.example%3A7777%2Fannounce\
                   &tr=udp%3A%2F%2Fopen.example%3A80%2Fannounce";
        let source = SwarmSource::parse(uri).unwrap();
        let trackers = source.trackers();
        assert_eq!(
            trackers,
            vec![
                "http://tracker.example:7777/announce".to_string(),
                "udp://open.example:80/announce".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_url_and_file() {
        assert!(matches!(
            SwarmSource::parse("https://example.org/x.torrent").unwrap(),
            SwarmSource::TorrentUrl(_)
        ));
        assert!(matches!(
            SwarmSource::parse("/tmp/x.torrent").unwrap(),
            SwarmSource::TorrentFile(_)
        ));
    }

    #[test]
    fn test_parse_empty_is_invalid() {
        assert!(matches!(
            SwarmSource::parse("  "),
            Err(EngineError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_hash_of_url_is_unknown() {
        let source = SwarmSource::parse("https://example.org/x.torrent").unwrap();
        assert!(source.info_hash().is_none());
        assert!(source.trackers().is_empty());
    }
}
