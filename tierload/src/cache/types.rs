//! Cache errors and configuration.

use thiserror::Error;

/// Default memory byte cache budget: 256 MB.
pub const DEFAULT_MEMORY_CACHE_BYTES: usize = 256 * 1024 * 1024;

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error while streaming an entry into the cache
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry is larger than the whole cache
    #[error("Cache entry too large: size={size}, limit={limit}")]
    EntryTooLarge { size: usize, limit: usize },

    /// Invalid cache configuration
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

/// Memory byte cache configuration.
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    max_size_bytes: usize,
}

impl MemoryCacheConfig {
    pub fn new(max_size_bytes: usize) -> Self {
        Self { max_size_bytes }
    }

    /// Maximum memory size in bytes.
    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    pub fn with_max_size_bytes(mut self, bytes: usize) -> Self {
        self.max_size_bytes = bytes;
        self
    }
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MEMORY_CACHE_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config_default() {
        assert_eq!(
            MemoryCacheConfig::default().max_size_bytes(),
            DEFAULT_MEMORY_CACHE_BYTES
        );
    }

    #[test]
    fn test_memory_config_builder() {
        let config = MemoryCacheConfig::default().with_max_size_bytes(1024);
        assert_eq!(config.max_size_bytes(), 1024);
    }

    #[test]
    fn test_error_display() {
        let err = CacheError::EntryTooLarge {
            size: 10,
            limit: 5,
        };
        assert_eq!(err.to_string(), "Cache entry too large: size=10, limit=5");
    }
}
