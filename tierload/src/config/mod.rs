//! Engine configuration.
//!
//! [`EngineConfig`] groups the knobs of the pool, the executor and the cache.
//! It can be built in code with `with_*` setters or loaded from an INI file:
//!
//! ```ini
//! [pool]
//! capacity = 150
//!
//! [executor]
//! lanes = 8
//!
//! [cache]
//! strategy = automatic
//! memory_size = 256MB
//! ```
//!
//! # Example
//!
//! ```
//! use tierload::config::EngineConfig;
//! use tierload::strategy::CacheStrategy;
//!
//! let config = EngineConfig::default()
//!     .with_executor_lanes(2)
//!     .with_cache_strategy(CacheStrategy::All);
//!
//! assert_eq!(config.executor_lanes(), 2);
//! ```

mod defaults;
mod parser;

pub use defaults::{default_lanes, num_cpus, MAX_EXECUTOR_LANES, MIN_EXECUTOR_LANES};
pub use parser::parse_size;

use crate::cache::{MemoryCacheConfig, DEFAULT_MEMORY_CACHE_BYTES};
use crate::executor::ExecutorConfig;
use crate::job::DEFAULT_POOL_CAPACITY;
use crate::strategy::CacheStrategy;
use ini::Ini;
use std::path::Path;
use thiserror::Error;

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Configuration for a [`Resolver`](crate::resolver::Resolver).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pool_capacity: usize,
    executor_lanes: usize,
    cache_strategy: CacheStrategy,
    memory_cache_bytes: usize,
}

impl EngineConfig {
    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parser::parse_ini(&ini)
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub fn with_executor_lanes(mut self, lanes: usize) -> Self {
        self.executor_lanes = lanes.max(MIN_EXECUTOR_LANES);
        self
    }

    /// Strategy applied to requests that don't choose their own.
    pub fn with_cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.cache_strategy = strategy;
        self
    }

    pub fn with_memory_cache_bytes(mut self, bytes: usize) -> Self {
        self.memory_cache_bytes = bytes;
        self
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    pub fn executor_lanes(&self) -> usize {
        self.executor_lanes
    }

    pub fn cache_strategy(&self) -> CacheStrategy {
        self.cache_strategy
    }

    pub fn memory_cache_bytes(&self) -> usize {
        self.memory_cache_bytes
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::new(self.executor_lanes)
    }

    pub fn memory_cache_config(&self) -> MemoryCacheConfig {
        MemoryCacheConfig::new(self.memory_cache_bytes)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            executor_lanes: default_lanes(),
            cache_strategy: CacheStrategy::default(),
            memory_cache_bytes: DEFAULT_MEMORY_CACHE_BYTES,
        }
    }
}
