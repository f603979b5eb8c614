//! Byte cache abstraction.
//!
//! The resolution engine persists two kinds of entries: raw source bytes and
//! transformed resources. Both are addressed by a [`StoreKey`](crate::key::StoreKey)
//! and written through a [`CacheWriter`] that streams the bytes at write time,
//! so nothing is serialized unless the store actually accepts the entry.

mod memory;
mod stats;
mod r#trait;
mod types;

pub use memory::MemoryByteCache;
pub use r#trait::{ByteCache, CacheWriter, NoOpByteCache};
pub use stats::CacheStats;
pub use types::{CacheError, MemoryCacheConfig, DEFAULT_MEMORY_CACHE_BYTES};
