//! Data fetchers.
//!
//! A [`DataFetcher`] produces one [`Payload`] for one attempt and reports it
//! through a [`DataCallback`]. Delivery may be synchronous (from inside
//! `load_data`) or asynchronous (from any other thread). Errors returned from
//! a synchronous callback must be passed back out of `load_data` so the job
//! run that started the fetch can propagate them.

mod async_adapter;
mod cached;

pub use async_adapter::AsyncFetcher;
pub use cached::CachedBytesFetcher;

use crate::error::{FetchError, JobError};
use crate::job::Priority;
use crate::resource::{Payload, TypeTag};
use crate::strategy::DataSource;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-attempt context handed to a fetcher.
#[derive(Debug, Clone)]
pub struct FetchContext {
    priority: Priority,
    cancellation: CancellationToken,
}

impl FetchContext {
    pub fn new(priority: Priority, cancellation: CancellationToken) -> Self {
        Self {
            priority,
            cancellation,
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Token cancelled when the owning job is cancelled.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Receives the outcome of a single fetch attempt.
pub trait DataCallback: Send + Sync {
    /// Data is available. `None` means the fetcher completed without data.
    fn on_data_ready(&self, data: Option<Payload>) -> Result<(), JobError>;

    /// The fetch failed.
    fn on_load_failed(&self, error: FetchError) -> Result<(), JobError>;
}

/// Retrieves the data for one load attempt.
pub trait DataFetcher: Send + Sync {
    /// Starts the fetch. The callback is invoked exactly once per call.
    fn load_data(
        &self,
        context: FetchContext,
        callback: Arc<dyn DataCallback>,
    ) -> Result<(), JobError>;

    /// Releases anything held for the attempt. Called exactly once per attempt.
    fn cleanup(&self);

    /// Interrupts an in-flight fetch, if possible.
    fn cancel(&self);

    fn data_source(&self) -> DataSource;

    fn data_type(&self) -> TypeTag;
}
