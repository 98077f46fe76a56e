// In-memory cache of compressed asset bodies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use bytes::Bytes;
use parking_lot::RwLock;

use super::compress::Encoding;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    modified: SystemTime,
    encoding: Encoding,
}

/// Compressed bodies keyed by file, modification time and encoding.
///
/// No size bound: entries only leave when the same file is stored again with
/// a newer modification time, or on [`CompressionCache::clear`].
pub struct CompressionCache {
    entries: RwLock<HashMap<CacheKey, Bytes>>,
    stored_bytes: AtomicU64,
}

impl CompressionCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stored_bytes: AtomicU64::new(0),
        }
    }

    pub fn get(&self, path: &Path, modified: SystemTime, encoding: Encoding) -> Option<Bytes> {
        let key = CacheKey {
            path: path.to_path_buf(),
            modified,
            encoding,
        };
        self.entries.read().get(&key).cloned()
    }

    /// Store a compressed body, dropping entries for older versions of the file.
    pub fn insert(&self, path: &Path, modified: SystemTime, encoding: Encoding, body: Bytes) {
        let mut entries = self.entries.write();

        let mut evicted = 0u64;
        entries.retain(|k, v| {
            let stale = k.path == path && k.encoding == encoding && k.modified != modified;
            if stale {
                evicted += v.len() as u64;
            }
            !stale
        });

        let added = body.len() as u64;
        let key = CacheKey {
            path: path.to_path_buf(),
            modified,
            encoding,
        };
        // Concurrent misses may both compress; the last write wins.
        if let Some(previous) = entries.insert(key, body) {
            evicted += previous.len() as u64;
        }

        self.stored_bytes.fetch_add(added, Ordering::Relaxed);
        self.stored_bytes.fetch_sub(evicted, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stored_bytes(&self) -> u64 {
        self.stored_bytes.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        self.stored_bytes.store(0, Ordering::Relaxed);
    }
}

impl Default for CompressionCache {
    fn default() -> Self {
        Self::new()
    }
}
