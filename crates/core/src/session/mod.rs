//! Swarm session management.
//!
//! Owns the set of active swarms and their lifecycle: joining through
//! the transfer engine, periodic metadata snapshots into the store,
//! statistics derivation, and eviction/close. Engine errors surface to
//! the caller; store errors are logged and absorbed.

mod speed;
mod types;

pub use speed::SpeedSampler;
pub use types::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::content::mime_for_path;
use crate::engine::{EngineError, JoinedSwarm, SwarmFile, SwarmSource, TransferEngine};
use crate::store::{LibraryEntry, MetadataStore, SwarmMetadata};

/// A resident swarm and its snapshot task.
struct ActiveSwarm {
    joined: JoinedSwarm,
    started_at: Instant,
    stop_tx: watch::Sender<bool>,
    snapshot_task: JoinHandle<()>,
}

/// Maps play requests onto swarm lifecycle operations.
///
/// Lifecycle mutations go through one coarse async lock (held across
/// the join, the designed blocking point). Statistics polling only
/// takes it briefly; throughput state lives behind the sampler's own
/// lock.
pub struct SessionManager {
    engine: Arc<dyn TransferEngine>,
    store: Arc<MetadataStore>,
    sampler: SpeedSampler,
    config: SessionConfig,
    active: Mutex<HashMap<String, ActiveSwarm>>,
}

impl SessionManager {
    pub fn new(
        engine: Arc<dyn TransferEngine>,
        store: Arc<MetadataStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            engine,
            store,
            sampler: SpeedSampler::new(),
            config,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve an identifier to a joined swarm and return its playable
    /// file list.
    ///
    /// Blocks until the engine has the swarm's basic metadata; use
    /// [`SessionManager::play_detached`] to run fire-and-continue. When
    /// another swarm is resident it is evicted first: final snapshot,
    /// engine release, and (with persistence disabled) cache record
    /// removal — at most one swarm stays resident.
    pub async fn play(
        &self,
        identifier: &str,
        catalog_id: i64,
        episode: u32,
    ) -> Result<Vec<PlayableFile>, EngineError> {
        let source = SwarmSource::parse(identifier)?;
        let mut active = self.active.lock().await;

        if let Some(hash) = source.info_hash() {
            if active.contains_key(&hash) {
                debug!(hash = %hash, "Swarm already resident");
                return self.playable_files(&hash).await;
            }
        }

        let resident: Vec<String> = active.keys().cloned().collect();
        for hash in resident {
            if let Some(swarm) = active.remove(&hash) {
                info!(hash = %hash, "Evicting resident swarm");
                self.shutdown(swarm, !self.config.persist, !self.config.persist)
                    .await;
            }
        }

        // The cache record is advisory; the engine rebuilds real state.
        if let Some(hash) = source.info_hash() {
            if let Some(prior) = self.store.get(&hash) {
                info!(
                    hash = %hash,
                    progress = prior.progress,
                    "Prior transfer state found, resuming"
                );
            }
        }

        let joined = self.engine.join(&source).await?;
        let hash = joined.hash.clone();
        info!(hash = %hash, name = %joined.name, "Swarm joined");

        self.sampler.reset(&hash);

        if !self.config.streamed {
            if let Err(e) = self.engine.download_all(&hash).await {
                warn!(hash = %hash, error = %e, "Failed to mark swarm for full download");
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let snapshot_task = tokio::spawn(snapshot_loop(
            Arc::clone(&self.engine),
            Arc::clone(&self.store),
            joined.clone(),
            catalog_id,
            episode,
            self.config.snapshot_interval,
            stop_rx,
        ));

        active.insert(
            hash.clone(),
            ActiveSwarm {
                joined,
                started_at: Instant::now(),
                stop_tx,
                snapshot_task,
            },
        );
        drop(active);

        self.playable_files(&hash).await
    }

    /// `play`, spawned on the runtime so the caller is not blocked on
    /// swarm metadata.
    pub fn play_detached(
        self: &Arc<Self>,
        identifier: String,
        catalog_id: i64,
        episode: u32,
    ) -> JoinHandle<Result<Vec<PlayableFile>, EngineError>> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.play(&identifier, catalog_id, episode).await })
    }

    /// Live statistics for an active swarm.
    pub async fn stats(&self, hash: &str) -> Result<SessionStats, EngineError> {
        let (joined, started_at) = {
            let active = self.active.lock().await;
            let swarm = active
                .get(hash)
                .ok_or_else(|| EngineError::SwarmNotFound(hash.to_string()))?;
            (swarm.joined.clone(), swarm.started_at)
        };

        let counters = self.engine.counters(hash).await?;
        let peers = self.engine.peers(hash).await?;
        let pieces = self.engine.piece_info(hash).await.unwrap_or_default();

        let (down, up) = self.sampler.sample(
            hash,
            counters.bytes_read,
            counters.bytes_written,
            Instant::now(),
        );

        let seeders = peers.iter().filter(|p| p.has_pieces).count() as u32;
        let wires = peers.len() as u32;

        let total = joined.size_bytes;
        let progress = if total > 0 {
            (counters.bytes_read as f64 / total as f64).min(1.0)
        } else {
            0.0
        };

        let remaining_secs = if down > 0 {
            total.saturating_sub(counters.bytes_read) / down
        } else {
            0
        };

        Ok(SessionStats {
            hash: joined.hash,
            name: joined.name,
            progress,
            peers: PeerCounts {
                seeders,
                leechers: wires - seeders,
                wires,
            },
            speed: SpeedStats { down, up },
            size: SizeStats {
                downloaded: counters.bytes_read,
                uploaded: counters.bytes_written,
                total,
            },
            time: TimeStats {
                remaining_secs,
                elapsed_secs: started_at.elapsed().as_secs(),
            },
            pieces: PieceStats {
                total: pieces.count,
                length: pieces.length,
            },
        })
    }

    /// Statistics for every active swarm.
    pub async fn all_stats(&self) -> Vec<SessionStats> {
        let hashes = self.active_hashes().await;
        let mut stats = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if let Ok(s) = self.stats(&hash).await {
                stats.push(s);
            }
        }
        stats
    }

    /// Final snapshot, then release from the engine (files kept).
    pub async fn close(&self, hash: &str) -> Result<(), EngineError> {
        let swarm = {
            let mut active = self.active.lock().await;
            active
                .remove(hash)
                .ok_or_else(|| EngineError::SwarmNotFound(hash.to_string()))?
        };
        info!(hash = %hash, "Closing swarm");
        self.shutdown(swarm, false, false).await;
        Ok(())
    }

    /// Close every active swarm.
    pub async fn close_all(&self) {
        let swarms: Vec<ActiveSwarm> = {
            let mut active = self.active.lock().await;
            active.drain().map(|(_, v)| v).collect()
        };
        for swarm in swarms {
            info!(hash = %swarm.joined.hash, "Closing swarm");
            self.shutdown(swarm, false, false).await;
        }
    }

    /// File list of an active swarm.
    pub async fn files(&self, hash: &str) -> Result<Vec<SwarmFile>, EngineError> {
        {
            let active = self.active.lock().await;
            if !active.contains_key(hash) {
                return Err(EngineError::SwarmNotFound(hash.to_string()));
            }
        }
        self.engine.files(hash).await
    }

    /// Hashes of the resident swarms.
    pub async fn active_hashes(&self) -> Vec<String> {
        self.active.lock().await.keys().cloned().collect()
    }

    /// Whether a swarm is currently resident.
    pub async fn is_active(&self, hash: &str) -> bool {
        self.active.lock().await.contains_key(hash)
    }

    /// Read bytes of one file of an active swarm.
    pub async fn read_range(
        &self,
        hash: &str,
        file_index: usize,
        start: u64,
        end: u64,
    ) -> Result<Vec<u8>, EngineError> {
        self.engine.read_range(hash, file_index, start, end).await
    }

    // ------------------------------------------------------------------
    // Cache/library projections
    // ------------------------------------------------------------------

    /// Every cached swarm, as listing entries.
    pub fn library(&self) -> Vec<LibraryEntry> {
        self.store.library()
    }

    /// Hashes with a cache record.
    pub fn cached(&self) -> Vec<String> {
        self.store.list()
    }

    /// Whether any episode of a catalog item is cached.
    pub fn is_catalog_cached(&self, catalog_id: i64) -> bool {
        !self.store.entries_for_catalog(catalog_id).is_empty()
    }

    /// Cached episodes of one catalog item.
    pub fn cached_episodes(&self, catalog_id: i64) -> Vec<LibraryEntry> {
        self.store.entries_for_catalog(catalog_id)
    }

    /// Entry count and total content bytes across the cache.
    pub fn cache_stats(&self) -> (usize, u64) {
        self.store.cache_stats()
    }

    /// Delete cache records, skipping any resident swarm. Returns the
    /// number of records removed.
    pub async fn delete_swarms(&self, hashes: &[String]) -> usize {
        let mut deleted = 0;
        for hash in hashes {
            if self.is_active(hash).await {
                debug!(hash = %hash, "Skipping delete of resident swarm");
                continue;
            }
            match self.store.delete(hash) {
                Ok(()) => deleted += 1,
                Err(e) => warn!(hash = %hash, error = %e, "Failed to delete cache record"),
            }
        }
        deleted
    }

    /// Drop every cached record of one catalog item.
    pub async fn clear_catalog_cache(&self, catalog_id: i64) -> usize {
        let hashes: Vec<String> = self
            .store
            .entries_for_catalog(catalog_id)
            .into_iter()
            .map(|e| e.hash)
            .collect();
        self.delete_swarms(&hashes).await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn playable_files(&self, hash: &str) -> Result<Vec<PlayableFile>, EngineError> {
        let files = self.engine.files(hash).await?;
        Ok(files
            .into_iter()
            .map(|f| PlayableFile {
                hash: hash.to_string(),
                mime: mime_for_path(&f.display_path).to_string(),
                url: format!(
                    "{}?hash={}&filepath={}",
                    self.config.stream_url,
                    hash,
                    urlencoding::encode(&f.display_path)
                ),
                name: f.display_path,
                size_bytes: f.size_bytes,
                index: f.index,
            })
            .collect())
    }

    /// Stop the snapshot task (one final write), release the swarm.
    async fn shutdown(&self, swarm: ActiveSwarm, drop_record: bool, delete_files: bool) {
        let hash = swarm.joined.hash.clone();

        let _ = swarm.stop_tx.send(true);
        if let Err(e) = swarm.snapshot_task.await {
            warn!(hash = %hash, error = %e, "Snapshot task did not stop cleanly");
        }

        if let Err(e) = self.engine.release(&hash, delete_files).await {
            warn!(hash = %hash, error = %e, "Failed to release swarm");
        }

        if drop_record {
            if let Err(e) = self.store.delete(&hash) {
                warn!(hash = %hash, error = %e, "Failed to delete cache record");
            }
        }

        self.sampler.reset(&hash);
    }
}

/// Periodic snapshot task for one swarm: immediate first write, one
/// write per interval, one final write when signalled (or when the
/// manager goes away).
async fn snapshot_loop(
    engine: Arc<dyn TransferEngine>,
    store: Arc<MetadataStore>,
    joined: JoinedSwarm,
    catalog_id: i64,
    episode: u32,
    interval: std::time::Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                write_snapshot(engine.as_ref(), &store, &joined, catalog_id, episode).await;
            }
            _ = stop_rx.changed() => {
                write_snapshot(engine.as_ref(), &store, &joined, catalog_id, episode).await;
                return;
            }
        }
    }
}

/// Persist the swarm's current state. Failures are telemetry, not
/// errors.
async fn write_snapshot(
    engine: &dyn TransferEngine,
    store: &MetadataStore,
    joined: &JoinedSwarm,
    catalog_id: i64,
    episode: u32,
) {
    let counters = match engine.counters(&joined.hash).await {
        Ok(c) => c,
        Err(e) => {
            warn!(hash = %joined.hash, error = %e, "Skipping snapshot, counters unavailable");
            return;
        }
    };

    let progress = if joined.size_bytes > 0 {
        (counters.bytes_read as f64 / joined.size_bytes as f64).min(1.0)
    } else {
        0.0
    };

    let meta = SwarmMetadata {
        hash: joined.hash.clone(),
        catalog_id,
        episode,
        name: joined.name.clone(),
        size_bytes: joined.size_bytes,
        progress,
        file_count: joined.file_count,
        announce: joined.trackers.clone(),
        private: joined.private,
        touched_at: Utc::now(),
    };

    if let Err(e) = store.set(&meta) {
        warn!(hash = %joined.hash, error = %e, "Failed to persist swarm snapshot");
    }
}
