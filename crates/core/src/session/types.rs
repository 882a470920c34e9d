//! Types for swarm session management.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Live statistics for an active swarm. Recomputed on demand, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub hash: String,
    pub name: String,
    /// Download progress, 0.0 - 1.0.
    pub progress: f64,
    pub peers: PeerCounts,
    pub speed: SpeedStats,
    pub size: SizeStats,
    pub time: TimeStats,
    pub pieces: PieceStats,
}

/// Peer breakdown. A peer counts as a seeder when it advertises at
/// least one piece it could send us.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PeerCounts {
    pub seeders: u32,
    pub leechers: u32,
    /// Total connected peers.
    pub wires: u32,
}

/// Instantaneous throughput in bytes/sec.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpeedStats {
    pub down: u64,
    pub up: u64,
}

/// Byte totals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SizeStats {
    pub downloaded: u64,
    pub uploaded: u64,
    pub total: u64,
}

/// Elapsed and estimated remaining transfer time, in seconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimeStats {
    /// 0 when the rate is unknown or the transfer is complete.
    pub remaining_secs: u64,
    pub elapsed_secs: u64,
}

/// Piece geometry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PieceStats {
    pub total: u32,
    pub length: u32,
}

/// A playable file of an active swarm, as handed to the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayableFile {
    /// Swarm hash the file belongs to.
    pub hash: String,
    /// Display name (the path shown to the user).
    pub name: String,
    /// MIME type served for this file.
    pub mime: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Position in the swarm's file list.
    pub index: usize,
    /// Streaming URL for this file.
    pub url: String,
}

/// Session manager tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Keep cache records and on-disk files of evicted swarms.
    pub persist: bool,
    /// Fetch pieces on demand instead of the whole swarm up front.
    pub streamed: bool,
    /// Interval between metadata snapshots of an active swarm.
    pub snapshot_interval: Duration,
    /// Base URL of the streaming endpoint, e.g. `http://127.0.0.1:8888/stream`.
    pub stream_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist: false,
            streamed: true,
            snapshot_interval: Duration::from_secs(20),
            stream_url: "http://127.0.0.1:8888/stream".to_string(),
        }
    }
}
