//! Throughput derivation from cumulative transfer counters.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// Minimum interval between samples that updates the baseline. Shorter
/// gaps would divide by a near-zero interval and spike under rapid
/// UI-driven polling.
const MIN_SAMPLE_INTERVAL_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
struct Baseline {
    bytes_read: u64,
    bytes_written: u64,
    at: Instant,
}

/// Derives instantaneous down/up speeds by differencing the engine's
/// monotonic byte counters over wall-clock time.
///
/// Keeps its own lock so statistics polling does not contend with
/// session lifecycle operations.
#[derive(Debug, Default)]
pub struct SpeedSampler {
    baselines: Mutex<HashMap<String, Baseline>>,
}

impl SpeedSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a sample for `hash` and return (down, up) in bytes/sec.
    ///
    /// The first sample for a hash records a baseline and returns
    /// (0, 0). Samples closer than the minimum interval return (0, 0)
    /// without touching the baseline.
    pub fn sample(
        &self,
        hash: &str,
        bytes_read: u64,
        bytes_written: u64,
        now: Instant,
    ) -> (u64, u64) {
        let mut baselines = self.baselines.lock().unwrap_or_else(|e| e.into_inner());

        let Some(prev) = baselines.get(hash).copied() else {
            baselines.insert(
                hash.to_string(),
                Baseline {
                    bytes_read,
                    bytes_written,
                    at: now,
                },
            );
            return (0, 0);
        };

        let elapsed = now.saturating_duration_since(prev.at).as_secs_f64();
        if elapsed < MIN_SAMPLE_INTERVAL_SECS {
            return (0, 0);
        }

        let down = (bytes_read.saturating_sub(prev.bytes_read) as f64 / elapsed) as u64;
        let up = (bytes_written.saturating_sub(prev.bytes_written) as f64 / elapsed) as u64;

        baselines.insert(
            hash.to_string(),
            Baseline {
                bytes_read,
                bytes_written,
                at: now,
            },
        );

        (down, up)
    }

    /// Forget a hash's baseline, so its next sample starts fresh.
    pub fn reset(&self, hash: &str) {
        self.baselines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_sample_is_zero() {
        let sampler = SpeedSampler::new();
        let now = Instant::now();
        assert_eq!(sampler.sample("h", 1_000_000, 500, now), (0, 0));
    }

    #[test]
    fn test_second_sample_computes_deltas() {
        let sampler = SpeedSampler::new();
        let t0 = Instant::now();
        sampler.sample("h", 1000, 100, t0);

        let t1 = t0 + Duration::from_secs(1);
        let (down, up) = sampler.sample("h", 1000 + 2048, 100 + 512, t1);
        assert_eq!(down, 2048);
        assert_eq!(up, 512);
    }

    #[test]
    fn test_fast_resample_holds_baseline() {
        let sampler = SpeedSampler::new();
        let t0 = Instant::now();
        sampler.sample("h", 0, 0, t0);

        // 50ms later: under the minimum interval, no update.
        let t1 = t0 + Duration::from_millis(50);
        assert_eq!(sampler.sample("h", 10_000, 10_000, t1), (0, 0));

        // A full second after t0 the original baseline still applies.
        let t2 = t0 + Duration::from_secs(1);
        let (down, up) = sampler.sample("h", 4096, 1024, t2);
        assert_eq!(down, 4096);
        assert_eq!(up, 1024);
    }

    #[test]
    fn test_half_second_interval_scales() {
        let sampler = SpeedSampler::new();
        let t0 = Instant::now();
        sampler.sample("h", 0, 0, t0);

        let t1 = t0 + Duration::from_millis(500);
        let (down, _) = sampler.sample("h", 1024, 0, t1);
        assert_eq!(down, 2048);
    }

    #[test]
    fn test_reset_forgets_baseline() {
        let sampler = SpeedSampler::new();
        let t0 = Instant::now();
        sampler.sample("h", 5000, 5000, t0);
        sampler.reset("h");

        let t1 = t0 + Duration::from_secs(1);
        assert_eq!(sampler.sample("h", 9000, 9000, t1), (0, 0));
    }

    #[test]
    fn test_hashes_are_independent() {
        let sampler = SpeedSampler::new();
        let t0 = Instant::now();
        sampler.sample("a", 0, 0, t0);

        // First sample for "b" is a baseline even though "a" exists.
        let t1 = t0 + Duration::from_secs(1);
        assert_eq!(sampler.sample("b", 777, 0, t1), (0, 0));
        assert_eq!(sampler.sample("a", 1024, 0, t1), (1024, 0));
    }
}
