//! Byte cache trait definition.

use crate::cache::types::CacheError;
use crate::cache::CacheStats;
use crate::key::StoreKey;
use bytes::Bytes;
use std::io::{self, Write};

/// Streams an entry's bytes into the cache at write time.
///
/// Implemented for any `Fn(&mut dyn Write) -> io::Result<()>` closure.
pub trait CacheWriter: Send + Sync {
    fn write(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl<F> CacheWriter for F
where
    F: Fn(&mut dyn Write) -> io::Result<()> + Send + Sync,
{
    fn write(&self, out: &mut dyn Write) -> io::Result<()> {
        self(out)
    }
}

/// Key-value byte store backing the resource and data cache tiers.
///
/// Implementations must tolerate concurrent `get`/`put`; concurrent puts to
/// the same key are last-write-wins.
///
/// # Example
///
/// ```
/// use tierload::cache::{ByteCache, MemoryByteCache};
/// use tierload::key::{DataCacheKey, DiskKey, Key, Signature};
///
/// let cache = MemoryByteCache::new(1024);
/// let key = DataCacheKey::new(Key::new("a"), Signature::empty()).store_key();
///
/// cache
///     .put(&key, &|out: &mut dyn std::io::Write| out.write_all(b"payload"))
///     .unwrap();
/// assert_eq!(cache.get(&key).unwrap().as_ref(), b"payload");
/// ```
pub trait ByteCache: Send + Sync {
    /// Get cached bytes for the given key.
    fn get(&self, key: &StoreKey) -> Option<Bytes>;

    /// Store the bytes produced by `writer` under `key`.
    fn put(&self, key: &StoreKey, writer: &dyn CacheWriter) -> Result<(), CacheError>;

    /// Remove an entry, if present.
    fn remove(&self, key: &StoreKey);

    /// Get cache statistics.
    fn stats(&self) -> CacheStats;
}

/// Byte cache that never stores anything.
///
/// Every lookup misses and every write is accepted without invoking the writer.
#[derive(Debug, Clone, Default)]
pub struct NoOpByteCache;

impl NoOpByteCache {
    pub fn new() -> Self {
        Self
    }
}

impl ByteCache for NoOpByteCache {
    fn get(&self, _key: &StoreKey) -> Option<Bytes> {
        None
    }

    fn put(&self, _key: &StoreKey, _writer: &dyn CacheWriter) -> Result<(), CacheError> {
        Ok(())
    }

    fn remove(&self, _key: &StoreKey) {}

    fn stats(&self) -> CacheStats {
        CacheStats::new()
    }
}
