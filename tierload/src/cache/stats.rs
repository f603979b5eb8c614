//! Cache statistics tracking.

use std::time::Instant;

/// Byte cache statistics for monitoring and debugging.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub evictions: u64,
    pub size_bytes: usize,
    pub entry_count: usize,

    pub created_at: Instant,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    /// Create a new statistics tracker.
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            writes: 0,
            write_failures: 0,
            evictions: 0,
            size_bytes: 0,
            entry_count: 0,
            created_at: Instant::now(),
        }
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    pub fn record_eviction(&mut self, count: u64) {
        self.evictions += count;
    }

    /// Update size metrics.
    pub fn update_size(&mut self, size_bytes: usize, entry_count: usize) {
        self.size_bytes = size_bytes;
        self.entry_count = entry_count;
    }
}
