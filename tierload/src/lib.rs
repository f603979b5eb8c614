//! Tierload - tiered resource resolution
//!
//! Resolves a request (a model plus size, options and a cache strategy) into a
//! decoded value by trying, in order, a cache of transformed results, a cache
//! of raw source bytes and finally the source itself. Cache writes are
//! deferred until after the caller has been notified.
//!
//! # High-Level API
//!
//! The [`resolver`] module wires the job pool to a lane executor:
//!
//! ```ignore
//! use tierload::resolver::Resolver;
//!
//! let resolver = Resolver::new(config, registry, cache);
//! tokio::spawn(resolver.executor().clone().run(shutdown.clone()));
//!
//! let job = resolver.resolve(spec, listener)?;
//! ```
//!
//! Lower-level pieces ([`job::JobPool`], [`job::ResolutionJob`],
//! [`executor::LaneExecutor`]) can be driven directly by embedders with their
//! own scheduling.

pub mod affinity;
pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod job;
pub mod key;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod resource;
pub mod strategy;

/// Version of the tierload library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
