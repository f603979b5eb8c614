//! Synchronous fetcher over bytes already read from the byte cache.

use super::{DataCallback, DataFetcher, FetchContext};
use crate::error::{FetchError, JobError};
use crate::resource::{Payload, TypeTag};
use crate::strategy::DataSource;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

/// Delivers cached bytes inline from `load_data`.
pub struct CachedBytesFetcher {
    data: Mutex<Option<Bytes>>,
    data_source: DataSource,
}

impl CachedBytesFetcher {
    pub fn new(data: Bytes, data_source: DataSource) -> Self {
        Self {
            data: Mutex::new(Some(data)),
            data_source,
        }
    }
}

impl DataFetcher for CachedBytesFetcher {
    fn load_data(
        &self,
        context: FetchContext,
        callback: Arc<dyn DataCallback>,
    ) -> Result<(), JobError> {
        if context.is_cancelled() {
            return callback.on_load_failed(FetchError::Cancelled);
        }
        let data = self.data.lock().clone();
        match data {
            Some(bytes) => callback.on_data_ready(Some(Payload::new(bytes))),
            None => callback.on_load_failed(FetchError::failed("cached bytes already released")),
        }
    }

    fn cleanup(&self) {
        self.data.lock().take();
    }

    fn cancel(&self) {}

    fn data_source(&self) -> DataSource {
        self.data_source
    }

    fn data_type(&self) -> TypeTag {
        TypeTag::of::<Bytes>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Priority;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Recorder {
        data: Mutex<Vec<Bytes>>,
        errors: Mutex<Vec<String>>,
    }

    impl DataCallback for Recorder {
        fn on_data_ready(&self, data: Option<Payload>) -> Result<(), JobError> {
            if let Some(bytes) = data.as_ref().and_then(|p| p.downcast_ref::<Bytes>()) {
                self.data.lock().push(bytes.clone());
            }
            Ok(())
        }

        fn on_load_failed(&self, error: FetchError) -> Result<(), JobError> {
            self.errors.lock().push(error.to_string());
            Ok(())
        }
    }

    fn context() -> FetchContext {
        FetchContext::new(Priority::Normal, CancellationToken::new())
    }

    #[test]
    fn test_delivers_inline() {
        let fetcher = CachedBytesFetcher::new(Bytes::from_static(b"cached"), DataSource::DataDiskCache);
        let recorder = Arc::new(Recorder::default());
        fetcher.load_data(context(), recorder.clone()).unwrap();

        assert_eq!(recorder.data.lock().as_slice(), &[Bytes::from_static(b"cached")]);
        assert_eq!(fetcher.data_source(), DataSource::DataDiskCache);
        assert!(fetcher.data_type().is::<Bytes>());
    }

    #[test]
    fn test_cancelled_context_fails() {
        let fetcher = CachedBytesFetcher::new(Bytes::from_static(b"x"), DataSource::ResourceDiskCache);
        let recorder = Arc::new(Recorder::default());
        let ctx = context();
        ctx.cancellation().cancel();
        fetcher.load_data(ctx, recorder.clone()).unwrap();

        assert!(recorder.data.lock().is_empty());
        assert_eq!(recorder.errors.lock().as_slice(), &["fetch cancelled".to_string()]);
    }

    #[test]
    fn test_cleanup_releases_bytes() {
        let fetcher = CachedBytesFetcher::new(Bytes::from_static(b"x"), DataSource::DataDiskCache);
        fetcher.cleanup();
        let recorder = Arc::new(Recorder::default());
        fetcher.load_data(context(), recorder.clone()).unwrap();
        assert_eq!(recorder.errors.lock().len(), 1);
    }
}
