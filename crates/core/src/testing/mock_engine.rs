//! Mock transfer engine for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::engine::{
    EngineError, JoinedSwarm, PeerInfo, PieceInfo, SwarmFile, SwarmSource, TransferCounters,
    TransferEngine,
};

const MOCK_PIECE_LENGTH: u32 = 16 * 1024;

#[derive(Debug, Clone)]
struct MockSwarm {
    joined: JoinedSwarm,
    files: Vec<SwarmFile>,
    content: Vec<Vec<u8>>,
    counters: TransferCounters,
    peers: Vec<PeerInfo>,
}

/// Scriptable implementation of the `TransferEngine` trait.
///
/// Swarms are seeded up front with `add_swarm`; joins only succeed for
/// seeded hashes (or registered aliases), and per-swarm counters and
/// peers can be mutated mid-test.
///
/// # Example
///
/// ```rust,ignore
/// let engine = MockEngine::new();
/// engine
///     .add_swarm("aaaa…", "Example Show - 01")
///     .with_file("ep01.mkv", vec![0u8; 1024])
///     .finish()
///     .await;
///
/// let joined = engine.join(&SwarmSource::parse("aaaa…")?).await?;
/// engine.set_counters(&joined.hash, 512, 0).await;
/// ```
#[derive(Default)]
pub struct MockEngine {
    swarms: RwLock<HashMap<String, MockSwarm>>,
    /// identifier string -> hash, for joins that can't carry a hash.
    aliases: RwLock<HashMap<String, String>>,
    joined: RwLock<HashMap<String, bool>>,
    released: RwLock<Vec<(String, bool)>>,
    download_all_calls: RwLock<Vec<String>>,
    join_count: RwLock<u32>,
    next_join_error: RwLock<Option<EngineError>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start seeding a swarm. Finish with [`MockSwarmBuilder::finish`].
    pub fn add_swarm<'a>(&'a self, hash: &str, name: &str) -> MockSwarmBuilder<'a> {
        MockSwarmBuilder {
            engine: self,
            hash: hash.to_lowercase(),
            name: name.to_string(),
            files: Vec::new(),
            private: false,
            trackers: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Fail the next join with this error.
    pub async fn fail_next_join(&self, error: EngineError) {
        *self.next_join_error.write().await = Some(error);
    }

    /// Overwrite the cumulative counters of a seeded swarm.
    pub async fn set_counters(&self, hash: &str, bytes_read: u64, bytes_written: u64) {
        if let Some(swarm) = self.swarms.write().await.get_mut(hash) {
            swarm.counters = TransferCounters {
                bytes_read,
                bytes_written,
            };
        }
    }

    /// Replace the peer list with `seeders` piece-bearing peers and
    /// `leechers` bare ones.
    pub async fn set_peers(&self, hash: &str, seeders: u32, leechers: u32) {
        if let Some(swarm) = self.swarms.write().await.get_mut(hash) {
            let mut peers = Vec::new();
            for i in 0..seeders {
                peers.push(PeerInfo {
                    addr: Some(format!("10.0.0.{}:6881", i + 1)),
                    has_pieces: true,
                });
            }
            for i in 0..leechers {
                peers.push(PeerInfo {
                    addr: Some(format!("10.0.1.{}:6881", i + 1)),
                    has_pieces: false,
                });
            }
            swarm.peers = peers;
        }
    }

    /// How many joins succeeded.
    pub async fn join_count(&self) -> u32 {
        *self.join_count.read().await
    }

    /// Whether a swarm was released.
    pub async fn was_released(&self, hash: &str) -> bool {
        self.released.read().await.iter().any(|(h, _)| h == hash)
    }

    /// Whether a swarm was released with file deletion.
    pub async fn was_released_with_files(&self, hash: &str) -> bool {
        self.released
            .read()
            .await
            .iter()
            .any(|(h, deleted)| h == hash && *deleted)
    }

    /// Hashes passed to `download_all`.
    pub async fn download_all_calls(&self) -> Vec<String> {
        self.download_all_calls.read().await.clone()
    }

    async fn resolve(&self, source: &SwarmSource) -> Option<String> {
        if let Some(hash) = source.info_hash() {
            return Some(hash);
        }
        let key = match source {
            SwarmSource::TorrentUrl(url) => url.clone(),
            SwarmSource::TorrentFile(path) => path.display().to_string(),
            _ => return None,
        };
        self.aliases.read().await.get(&key).cloned()
    }

    async fn require_joined(&self, hash: &str) -> Result<(), EngineError> {
        if self.joined.read().await.contains_key(hash) {
            Ok(())
        } else {
            Err(EngineError::SwarmNotFound(hash.to_string()))
        }
    }
}

/// Builder for one seeded mock swarm.
pub struct MockSwarmBuilder<'a> {
    engine: &'a MockEngine,
    hash: String,
    name: String,
    files: Vec<(String, Vec<u8>)>,
    private: bool,
    trackers: Vec<String>,
    aliases: Vec<String>,
}

impl<'a> MockSwarmBuilder<'a> {
    /// Add a file with literal content.
    pub fn with_file(mut self, display_path: &str, content: Vec<u8>) -> Self {
        self.files.push((display_path.to_string(), content));
        self
    }

    /// Mark the swarm private.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Announce endpoints reported at join time.
    pub fn with_trackers(mut self, trackers: Vec<String>) -> Self {
        self.trackers = trackers;
        self
    }

    /// Let a non-hash identifier (torrent URL / file path) resolve to
    /// this swarm.
    pub fn with_alias(mut self, identifier: &str) -> Self {
        self.aliases.push(identifier.to_string());
        self
    }

    /// Register the swarm with the engine.
    pub async fn finish(self) {
        let size_bytes: u64 = self.files.iter().map(|(_, c)| c.len() as u64).sum();
        let files: Vec<SwarmFile> = self
            .files
            .iter()
            .enumerate()
            .map(|(index, (path, content))| SwarmFile {
                index,
                display_path: path.clone(),
                size_bytes: content.len() as u64,
            })
            .collect();
        let content: Vec<Vec<u8>> = self.files.into_iter().map(|(_, c)| c).collect();

        let swarm = MockSwarm {
            joined: JoinedSwarm {
                hash: self.hash.clone(),
                name: self.name,
                size_bytes,
                file_count: files.len() as u32,
                private: self.private,
                trackers: self.trackers,
            },
            files,
            content,
            counters: TransferCounters::default(),
            peers: Vec::new(),
        };

        self.engine
            .swarms
            .write()
            .await
            .insert(self.hash.clone(), swarm);

        let mut aliases = self.engine.aliases.write().await;
        for alias in self.aliases {
            aliases.insert(alias, self.hash.clone());
        }
    }
}

#[async_trait]
impl TransferEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn join(&self, source: &SwarmSource) -> Result<JoinedSwarm, EngineError> {
        if let Some(error) = self.next_join_error.write().await.take() {
            return Err(error);
        }

        let hash = self
            .resolve(source)
            .await
            .ok_or_else(|| EngineError::InvalidIdentifier(format!("{:?}", source)))?;

        let joined = {
            let swarms = self.swarms.read().await;
            swarms
                .get(&hash)
                .map(|s| s.joined.clone())
                .ok_or_else(|| EngineError::JoinFailed(format!("unknown swarm {}", hash)))?
        };

        self.joined.write().await.insert(hash, true);
        *self.join_count.write().await += 1;
        Ok(joined)
    }

    async fn files(&self, hash: &str) -> Result<Vec<SwarmFile>, EngineError> {
        self.require_joined(hash).await?;
        let swarms = self.swarms.read().await;
        Ok(swarms
            .get(hash)
            .map(|s| s.files.clone())
            .unwrap_or_default())
    }

    async fn counters(&self, hash: &str) -> Result<TransferCounters, EngineError> {
        self.require_joined(hash).await?;
        let swarms = self.swarms.read().await;
        Ok(swarms
            .get(hash)
            .map(|s| s.counters)
            .unwrap_or_default())
    }

    async fn peers(&self, hash: &str) -> Result<Vec<PeerInfo>, EngineError> {
        self.require_joined(hash).await?;
        let swarms = self.swarms.read().await;
        Ok(swarms
            .get(hash)
            .map(|s| s.peers.clone())
            .unwrap_or_default())
    }

    async fn piece_info(&self, hash: &str) -> Result<PieceInfo, EngineError> {
        self.require_joined(hash).await?;
        let swarms = self.swarms.read().await;
        let total = swarms.get(hash).map(|s| s.joined.size_bytes).unwrap_or(0);
        Ok(PieceInfo {
            count: total.div_ceil(MOCK_PIECE_LENGTH as u64) as u32,
            length: MOCK_PIECE_LENGTH,
        })
    }

    async fn read_range(
        &self,
        hash: &str,
        file_index: usize,
        start: u64,
        end: u64,
    ) -> Result<Vec<u8>, EngineError> {
        self.require_joined(hash).await?;
        let swarms = self.swarms.read().await;
        let swarm = swarms
            .get(hash)
            .ok_or_else(|| EngineError::SwarmNotFound(hash.to_string()))?;
        let content = swarm
            .content
            .get(file_index)
            .ok_or_else(|| EngineError::FileNotFound(format!("file {}", file_index)))?;

        let len = content.len() as u64;
        let start = start.min(len);
        let end = end.min(len);
        Ok(content[start as usize..end as usize].to_vec())
    }

    async fn download_all(&self, hash: &str) -> Result<(), EngineError> {
        self.require_joined(hash).await?;
        self.download_all_calls.write().await.push(hash.to_string());
        Ok(())
    }

    async fn release(&self, hash: &str, delete_files: bool) -> Result<(), EngineError> {
        self.require_joined(hash).await?;
        self.joined.write().await.remove(hash);
        self.released
            .write()
            .await
            .push((hash.to_string(), delete_files));
        Ok(())
    }
}
