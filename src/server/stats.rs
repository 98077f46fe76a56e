// Live request statistics: response counts, bytes served, compression cache hit rate.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub bytes_served: u64,
    pub not_modified: u64,
    pub partial: u64,
    pub rejected: u64,
    pub compression_hits: u64,
    pub compression_misses: u64,
    pub compression_hit_rate: f64,
}

pub struct ServerStats {
    requests: AtomicU64,
    bytes_served: AtomicU64,
    not_modified: AtomicU64,
    partial: AtomicU64,
    rejected: AtomicU64,
    compression_hits: AtomicU64,
    compression_misses: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            bytes_served: AtomicU64::new(0),
            not_modified: AtomicU64::new(0),
            partial: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            compression_hits: AtomicU64::new(0),
            compression_misses: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_served(&self, bytes: u64) {
        self.bytes_served.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_not_modified(&self) {
        self.not_modified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_partial(&self) {
        self.partial.fetch_add(1, Ordering::Relaxed);
    }

    /// 403/404/416 responses.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compression(&self, cache_hit: bool) {
        if cache_hit {
            self.compression_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.compression_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let hits = self.compression_hits.load(Ordering::Relaxed);
        let misses = self.compression_misses.load(Ordering::Relaxed);
        let compression_hit_rate = if hits + misses > 0 {
            hits as f64 / (hits + misses) as f64
        } else {
            0.0
        };

        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            bytes_served: self.bytes_served.load(Ordering::Relaxed),
            not_modified: self.not_modified.load(Ordering::Relaxed),
            partial: self.partial.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            compression_hits: hits,
            compression_misses: misses,
            compression_hit_rate,
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}
