//! In-memory byte cache with LRU eviction.

use crate::cache::r#trait::{ByteCache, CacheWriter};
use crate::cache::types::{CacheError, MemoryCacheConfig};
use crate::cache::CacheStats;
use crate::key::StoreKey;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Entry in the memory cache.
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Bytes,
    /// Logical access tick for LRU eviction
    last_accessed: u64,
}

struct Inner {
    entries: HashMap<StoreKey, CacheEntry>,
    size_bytes: usize,
    tick: u64,
    stats: CacheStats,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn sync_size(&mut self) {
        let (size, count) = (self.size_bytes, self.entries.len());
        self.stats.update_size(size, count);
    }
}

/// In-memory [`ByteCache`].
///
/// Entries are streamed into a buffer first; the store is only touched once the
/// writer has succeeded, so a failing writer never leaves a partial entry behind.
pub struct MemoryByteCache {
    inner: Mutex<Inner>,
    max_size_bytes: usize,
}

impl MemoryByteCache {
    /// Create a new memory cache with the given size limit.
    pub fn new(max_size_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                size_bytes: 0,
                tick: 0,
                stats: CacheStats::new(),
            }),
            max_size_bytes,
        }
    }

    pub fn from_config(config: &MemoryCacheConfig) -> Self {
        Self::new(config.max_size_bytes())
    }

    pub fn contains(&self, key: &StoreKey) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    pub fn entry_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn size_bytes(&self) -> usize {
        self.inner.lock().size_bytes
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.size_bytes = 0;
        inner.sync_size();
    }

    /// Evict least recently used entries until `required` more bytes fit.
    fn evict_for(&self, inner: &mut Inner, required: usize) {
        if inner.size_bytes + required <= self.max_size_bytes {
            return;
        }
        let target = self.max_size_bytes.saturating_sub(required);

        let mut by_age: Vec<(StoreKey, u64, usize)> = inner
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.last_accessed, v.data.len()))
            .collect();
        by_age.sort_by_key(|(_, accessed, _)| *accessed);

        let mut evicted = 0;
        for (key, _, size) in by_age {
            if inner.size_bytes <= target {
                break;
            }
            inner.entries.remove(&key);
            inner.size_bytes = inner.size_bytes.saturating_sub(size);
            evicted += 1;
        }

        if evicted > 0 {
            tracing::debug!(evicted, size_bytes = inner.size_bytes, "Memory byte cache eviction");
        }
        inner.stats.record_eviction(evicted);
    }
}

impl ByteCache for MemoryByteCache {
    fn get(&self, key: &StoreKey) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        let data = inner.entries.get_mut(key).map(|entry| {
            entry.last_accessed = tick;
            entry.data.clone()
        });

        match data {
            Some(data) => {
                inner.stats.record_hit();
                Some(data)
            }
            None => {
                inner.stats.record_miss();
                None
            }
        }
    }

    fn put(&self, key: &StoreKey, writer: &dyn CacheWriter) -> Result<(), CacheError> {
        let mut buffer = Vec::new();
        if let Err(e) = writer.write(&mut buffer) {
            self.inner.lock().stats.record_write_failure();
            return Err(CacheError::Io(e));
        }

        let size = buffer.len();
        if size > self.max_size_bytes {
            self.inner.lock().stats.record_write_failure();
            return Err(CacheError::EntryTooLarge {
                size,
                limit: self.max_size_bytes,
            });
        }

        let mut inner = self.inner.lock();
        if let Some(old) = inner.entries.remove(key) {
            inner.size_bytes = inner.size_bytes.saturating_sub(old.data.len());
        }
        self.evict_for(&mut inner, size);

        let tick = inner.next_tick();
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                data: Bytes::from(buffer),
                last_accessed: tick,
            },
        );
        inner.size_bytes += size;
        inner.stats.record_write();
        inner.sync_size();
        Ok(())
    }

    fn remove(&self, key: &StoreKey) {
        let mut inner = self.inner.lock();
        if let Some(old) = inner.entries.remove(key) {
            inner.size_bytes = inner.size_bytes.saturating_sub(old.data.len());
            inner.sync_size();
        }
    }

    fn stats(&self) -> CacheStats {
        self.inner.lock().stats.clone()
    }
}
