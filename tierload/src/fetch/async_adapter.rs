//! Adapter running an async fetch on a Tokio runtime.

use super::{DataCallback, DataFetcher, FetchContext};
use crate::error::{FetchError, JobError};
use crate::resource::{Payload, TypeTag};
use crate::strategy::DataSource;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send>>;

/// Fetcher that spawns an async fetch and reports from a runtime thread.
///
/// The fetch races the job's cancellation token and the fetcher's own
/// [`cancel`](DataFetcher::cancel); either one ends the attempt with
/// [`FetchError::Cancelled`].
pub struct AsyncFetcher<T> {
    handle: Handle,
    data_source: DataSource,
    fetch: Box<dyn Fn() -> FetchFuture<T> + Send + Sync>,
    cancellation: CancellationToken,
    cleanups: AtomicUsize,
}

impl<T: Any + Send + Sync> AsyncFetcher<T> {
    /// `fetch` is invoked once per `load_data` call.
    pub fn new<F, Fut>(handle: Handle, data_source: DataSource, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        Self {
            handle,
            data_source,
            fetch: Box::new(move || Box::pin(fetch())),
            cancellation: CancellationToken::new(),
            cleanups: AtomicUsize::new(0),
        }
    }

    /// Number of times `cleanup` has been called.
    pub fn cleanup_count(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

impl<T: Any + Send + Sync> DataFetcher for AsyncFetcher<T> {
    fn load_data(
        &self,
        context: FetchContext,
        callback: Arc<dyn DataCallback>,
    ) -> Result<(), JobError> {
        let future = (self.fetch)();
        let job_token = context.cancellation().clone();
        let own_token = self.cancellation.clone();
        let data_source = self.data_source;

        self.handle.spawn(async move {
            let outcome = tokio::select! {
                _ = job_token.cancelled() => Err(FetchError::Cancelled),
                _ = own_token.cancelled() => Err(FetchError::Cancelled),
                result = future => result,
            };

            let delivered = match outcome {
                Ok(value) => callback.on_data_ready(Some(Payload::new(value))),
                Err(e) => {
                    debug!(data_source = %data_source, error = %e, "Async fetch failed");
                    callback.on_load_failed(e)
                }
            };

            if let Err(e) = delivered {
                error!(data_source = %data_source, error = %e, "Fetch callback failed");
            }
        });

        Ok(())
    }

    fn cleanup(&self) {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.cancellation.cancel();
    }

    fn data_source(&self) -> DataSource {
        self.data_source
    }

    fn data_type(&self) -> TypeTag {
        TypeTag::of::<T>()
    }
}
