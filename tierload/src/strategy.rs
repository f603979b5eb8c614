//! Provenance, encode strategies and cache strategies.

use std::fmt;
use std::str::FromStr;

/// Where the data used for decoding ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Data was read from the local device (a file, a bundled asset).
    Local,
    /// Data was retrieved from a remote source.
    Remote,
    /// Raw source bytes were read from the byte cache.
    DataDiskCache,
    /// A transformed resource was read from the byte cache.
    ResourceDiskCache,
    /// A decoded object was served from an in-memory object cache.
    MemoryCache,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::DataDiskCache => "data-disk-cache",
            Self::ResourceDiskCache => "resource-disk-cache",
            Self::MemoryCache => "memory-cache",
        };
        f.write_str(name)
    }
}

/// How a decoded resource should be persisted back into the byte cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodeStrategy {
    /// Write the original source bytes.
    Source,
    /// Write the transformed resource bytes.
    Transformed,
    /// Do not write anything.
    None,
}

impl fmt::Display for EncodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Source => "source",
            Self::Transformed => "transformed",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Which cache tiers a request may decode from, and what it may write back.
///
/// # Example
///
/// ```
/// use tierload::strategy::{CacheStrategy, DataSource, EncodeStrategy};
///
/// let strategy = CacheStrategy::Automatic;
/// assert!(strategy.decode_cached_resource());
/// assert!(strategy.is_data_cacheable(DataSource::Remote));
/// assert!(!strategy.is_resource_cacheable(false, DataSource::Remote, EncodeStrategy::Transformed));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheStrategy {
    /// Cache remote data as source bytes and every decoded result as transformed bytes.
    All,
    /// Never read or write the byte cache.
    None,
    /// Only cache raw source data.
    Data,
    /// Only cache transformed resources.
    Resource,
    /// Cache remote source data, and transformed results of local or alternate-key data.
    #[default]
    Automatic,
}

impl CacheStrategy {
    /// Every strategy, in declaration order.
    pub const ALL_STRATEGIES: [CacheStrategy; 5] = [
        CacheStrategy::All,
        CacheStrategy::None,
        CacheStrategy::Data,
        CacheStrategy::Resource,
        CacheStrategy::Automatic,
    ];

    /// Whether raw data from `data_source` should be written to the byte cache.
    pub fn is_data_cacheable(&self, data_source: DataSource) -> bool {
        match self {
            Self::All | Self::Automatic => data_source == DataSource::Remote,
            Self::None | Self::Resource => false,
            Self::Data => {
                data_source != DataSource::DataDiskCache && data_source != DataSource::MemoryCache
            }
        }
    }

    /// Whether a decoded resource should be written to the byte cache.
    ///
    /// `is_from_alternate_key` is true when the data was found under one of the
    /// request's alternate keys rather than its primary source key.
    pub fn is_resource_cacheable(
        &self,
        is_from_alternate_key: bool,
        data_source: DataSource,
        encode_strategy: EncodeStrategy,
    ) -> bool {
        match self {
            Self::All | Self::Resource => {
                data_source != DataSource::ResourceDiskCache
                    && data_source != DataSource::MemoryCache
            }
            Self::None | Self::Data => false,
            Self::Automatic => {
                ((is_from_alternate_key && data_source == DataSource::DataDiskCache)
                    || data_source == DataSource::Local)
                    && encode_strategy == EncodeStrategy::Transformed
            }
        }
    }

    /// Whether the transformed-resource cache tier may be consulted.
    pub fn decode_cached_resource(&self) -> bool {
        matches!(self, Self::All | Self::Resource | Self::Automatic)
    }

    /// Whether the raw-source cache tier may be consulted.
    pub fn decode_cached_data(&self) -> bool {
        matches!(self, Self::All | Self::Data | Self::Automatic)
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::None => "none",
            Self::Data => "data",
            Self::Resource => "resource",
            Self::Automatic => "automatic",
        };
        f.write_str(name)
    }
}

impl FromStr for CacheStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "none" => Ok(Self::None),
            "data" => Ok(Self::Data),
            "resource" => Ok(Self::Resource),
            "automatic" | "auto" => Ok(Self::Automatic),
            other => Err(format!("unknown cache strategy '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_disables_everything() {
        let s = CacheStrategy::None;
        assert!(!s.decode_cached_resource());
        assert!(!s.decode_cached_data());
        assert!(!s.is_data_cacheable(DataSource::Remote));
        assert!(!s.is_resource_cacheable(true, DataSource::Local, EncodeStrategy::Transformed));
    }

    #[test]
    fn test_all_caches_everything_not_already_cached() {
        let s = CacheStrategy::All;
        assert!(s.is_data_cacheable(DataSource::Remote));
        assert!(!s.is_data_cacheable(DataSource::Local));
        assert!(s.is_resource_cacheable(false, DataSource::Remote, EncodeStrategy::Transformed));
        assert!(s.is_resource_cacheable(false, DataSource::DataDiskCache, EncodeStrategy::Source));
        assert!(!s.is_resource_cacheable(
            false,
            DataSource::ResourceDiskCache,
            EncodeStrategy::Transformed
        ));
        assert!(!s.is_resource_cacheable(false, DataSource::MemoryCache, EncodeStrategy::Transformed));
    }

    #[test]
    fn test_data_strategy() {
        let s = CacheStrategy::Data;
        assert!(!s.decode_cached_resource());
        assert!(s.decode_cached_data());
        assert!(s.is_data_cacheable(DataSource::Remote));
        assert!(s.is_data_cacheable(DataSource::Local));
        assert!(!s.is_data_cacheable(DataSource::DataDiskCache));
        assert!(!s.is_resource_cacheable(false, DataSource::Remote, EncodeStrategy::Transformed));
    }

    #[test]
    fn test_resource_strategy() {
        let s = CacheStrategy::Resource;
        assert!(s.decode_cached_resource());
        assert!(!s.decode_cached_data());
        assert!(!s.is_data_cacheable(DataSource::Remote));
        assert!(s.is_resource_cacheable(false, DataSource::Remote, EncodeStrategy::Transformed));
    }

    #[test]
    fn test_automatic_resource_cacheability() {
        let s = CacheStrategy::Automatic;
        // Remote data is cached as source bytes, not as a transformed resource
        assert!(!s.is_resource_cacheable(false, DataSource::Remote, EncodeStrategy::Transformed));
        // Primary-key data cache hits are already in cacheable form
        assert!(!s.is_resource_cacheable(
            false,
            DataSource::DataDiskCache,
            EncodeStrategy::Transformed
        ));
        assert!(s.is_resource_cacheable(true, DataSource::DataDiskCache, EncodeStrategy::Transformed));
        assert!(s.is_resource_cacheable(false, DataSource::Local, EncodeStrategy::Transformed));
        assert!(!s.is_resource_cacheable(false, DataSource::Local, EncodeStrategy::Source));
    }

    #[test]
    fn test_parse_round_trip() {
        for strategy in CacheStrategy::ALL_STRATEGIES {
            let parsed: CacheStrategy = strategy.to_string().parse().unwrap();
            assert_eq!(parsed, strategy);
        }
        assert_eq!("AUTO".parse::<CacheStrategy>().unwrap(), CacheStrategy::Automatic);
        assert!("sometimes".parse::<CacheStrategy>().is_err());
    }
}
