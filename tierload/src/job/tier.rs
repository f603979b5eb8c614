//! Tier generators: the candidate iteration for one stage of a job.
//!
//! Each generator walks its own candidate list and starts at most one fetch
//! per `start_next` call. The cursor lock is never held across a fetcher call,
//! since synchronous fetchers re-enter the job (and therefore the generator)
//! from inside `load_data`.

use crate::decode::DecodeHelper;
use crate::error::{FetchError, JobError};
use crate::fetch::{CachedBytesFetcher, DataCallback, DataFetcher, FetchContext};
use crate::job::resolution::JobLink;
use crate::key::{DataCacheKey, DiskKey, Key, ResourceCacheKey};
use crate::resource::{Payload, TypeTag};
use crate::strategy::DataSource;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

/// One fetch attempt: which key it serves and who is fetching it.
#[derive(Clone)]
pub(crate) struct AttemptInfo {
    /// Source key the data belongs to.
    pub(crate) source_key: Key,
    /// Key reported in faults (the store key for cache tiers).
    pub(crate) attempted_key: Key,
    pub(crate) fetcher: Arc<dyn DataFetcher>,
    pub(crate) data_source: DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TierKind {
    ResourceCache,
    DataCache,
    Source,
}

/// State shared by all tier flavours.
struct TierShared<R> {
    helper: Arc<DecodeHelper<R>>,
    link: JobLink<R>,
    context: FetchContext,
    active: Mutex<Option<Arc<dyn DataFetcher>>>,
}

impl<R: Send + 'static> TierShared<R> {
    fn new(helper: Arc<DecodeHelper<R>>, link: JobLink<R>, context: FetchContext) -> Self {
        Self {
            helper,
            link,
            context,
            active: Mutex::new(None),
        }
    }

    fn start(&self, attempt: AttemptInfo, kind: TierKind) -> Result<(), JobError> {
        trace!(
            key = %attempt.attempted_key,
            data_source = %attempt.data_source,
            tier = ?kind,
            "Starting fetch"
        );
        let fetcher = attempt.fetcher.clone();
        *self.active.lock() = Some(fetcher.clone());

        let callback = Arc::new(AttemptCallback {
            link: self.link.clone(),
            helper: self.helper.clone(),
            attempt,
            kind,
        });
        fetcher.load_data(self.context.clone(), callback)
    }

    fn cancel(&self) {
        let active = self.active.lock().clone();
        if let Some(fetcher) = active {
            fetcher.cancel();
        }
    }
}

#[derive(Debug, Default)]
struct Cursor {
    key_index: usize,
    type_index: usize,
}

/// Looks up cached bytes under keys derived from the request's cache keys.
pub(crate) struct CacheTier<R> {
    shared: TierShared<R>,
    cursor: Mutex<Cursor>,
    resource_types: OnceLock<Vec<TypeTag>>,
}

/// Walks the load data built by the model loaders.
pub(crate) struct SourceTier<R> {
    shared: TierShared<R>,
    next_index: Mutex<usize>,
}

/// The generator for one stage.
pub(crate) enum TierGenerator<R> {
    ResourceCache(CacheTier<R>),
    DataCache(CacheTier<R>),
    Source(SourceTier<R>),
}

impl<R: Send + 'static> TierGenerator<R> {
    pub(crate) fn resource_cache(
        helper: Arc<DecodeHelper<R>>,
        link: JobLink<R>,
        context: FetchContext,
    ) -> Self {
        Self::ResourceCache(CacheTier::new(helper, link, context))
    }

    pub(crate) fn data_cache(
        helper: Arc<DecodeHelper<R>>,
        link: JobLink<R>,
        context: FetchContext,
    ) -> Self {
        Self::DataCache(CacheTier::new(helper, link, context))
    }

    pub(crate) fn source(
        helper: Arc<DecodeHelper<R>>,
        link: JobLink<R>,
        context: FetchContext,
    ) -> Self {
        Self::Source(SourceTier {
            shared: TierShared::new(helper, link, context),
            next_index: Mutex::new(0),
        })
    }

    /// Starts the next candidate fetch. `Ok(false)` means the tier is exhausted.
    pub(crate) fn start_next(&self) -> Result<bool, JobError> {
        match self {
            Self::ResourceCache(tier) => tier.start_next_resource(),
            Self::DataCache(tier) => tier.start_next_data(),
            Self::Source(tier) => tier.start_next(),
        }
    }

    /// Cancels the in-flight fetch, if any.
    pub(crate) fn cancel(&self) {
        match self {
            Self::ResourceCache(tier) | Self::DataCache(tier) => tier.shared.cancel(),
            Self::Source(tier) => tier.shared.cancel(),
        }
    }
}

impl<R: Send + 'static> CacheTier<R> {
    fn new(helper: Arc<DecodeHelper<R>>, link: JobLink<R>, context: FetchContext) -> Self {
        Self {
            shared: TierShared::new(helper, link, context),
            cursor: Mutex::new(Cursor::default()),
            resource_types: OnceLock::new(),
        }
    }

    /// Next (cache key, resource type) pair, keys outermost.
    fn next_pair(&self, keys: &[Key], types: &[TypeTag]) -> Option<(Key, TypeTag)> {
        let mut cursor = self.cursor.lock();
        let key = keys.get(cursor.key_index)?.clone();
        let resource_type = *types.get(cursor.type_index)?;
        cursor.type_index += 1;
        if cursor.type_index >= types.len() {
            cursor.type_index = 0;
            cursor.key_index += 1;
        }
        Some((key, resource_type))
    }

    fn start_next_resource(&self) -> Result<bool, JobError> {
        let helper = &self.shared.helper;
        let keys = helper.cache_keys();
        if keys.is_empty() {
            return Ok(false);
        }

        let types = self
            .resource_types
            .get_or_init(|| helper.registered_resource_types());
        if types.is_empty() {
            return Err(JobError::NoLoadPath {
                model: helper.model().to_string(),
                transcode: helper.transcode_name(),
            });
        }

        while let Some((source_key, resource_type)) = self.next_pair(keys, types) {
            let transformation = helper.transformation(resource_type)?;
            let store_key = ResourceCacheKey::new(
                source_key.clone(),
                helper.signature().clone(),
                helper.width(),
                helper.height(),
                transformation.id(),
                resource_type,
                helper.options().clone(),
            )
            .store_key();

            let Some(bytes) = helper.cache().get(&store_key) else {
                continue;
            };
            let fetcher: Arc<dyn DataFetcher> =
                Arc::new(CachedBytesFetcher::new(bytes, DataSource::ResourceDiskCache));
            if !helper.has_load_path(fetcher.data_type()) {
                debug!(key = %source_key, "No load path for cached resource bytes");
                continue;
            }

            let attempt = AttemptInfo {
                source_key,
                attempted_key: Key::new(store_key.to_string()),
                fetcher,
                data_source: DataSource::ResourceDiskCache,
            };
            self.shared.start(attempt, TierKind::ResourceCache)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn start_next_data(&self) -> Result<bool, JobError> {
        let helper = &self.shared.helper;
        let keys = helper.cache_keys();

        loop {
            let source_key = {
                let mut cursor = self.cursor.lock();
                let Some(key) = keys.get(cursor.key_index) else {
                    return Ok(false);
                };
                cursor.key_index += 1;
                key.clone()
            };

            let store_key =
                DataCacheKey::new(source_key.clone(), helper.signature().clone()).store_key();
            let Some(bytes) = helper.cache().get(&store_key) else {
                continue;
            };
            let fetcher: Arc<dyn DataFetcher> =
                Arc::new(CachedBytesFetcher::new(bytes, DataSource::DataDiskCache));
            if !helper.has_load_path(fetcher.data_type()) {
                debug!(key = %source_key, "No load path for cached source bytes");
                continue;
            }

            let attempt = AttemptInfo {
                source_key,
                attempted_key: Key::new(store_key.to_string()),
                fetcher,
                data_source: DataSource::DataDiskCache,
            };
            self.shared.start(attempt, TierKind::DataCache)?;
            return Ok(true);
        }
    }
}

impl<R: Send + 'static> SourceTier<R> {
    fn start_next(&self) -> Result<bool, JobError> {
        let helper = &self.shared.helper;
        let load_data = helper.load_data();
        let strategy = helper.cache_strategy();

        loop {
            let data = {
                let mut next = self.next_index.lock();
                let Some(data) = load_data.get(*next) else {
                    return Ok(false);
                };
                *next += 1;
                data
            };

            let fetcher = data.fetcher().clone();
            if !strategy.is_data_cacheable(fetcher.data_source())
                && !helper.has_load_path(fetcher.data_type())
            {
                debug!(
                    key = %data.source_key(),
                    data_type = %fetcher.data_type(),
                    "Skipping source with no way to decode or cache it"
                );
                continue;
            }

            let attempt = AttemptInfo {
                source_key: data.source_key().clone(),
                attempted_key: data.source_key().clone(),
                data_source: fetcher.data_source(),
                fetcher,
            };
            self.shared.start(attempt, TierKind::Source)?;
            return Ok(true);
        }
    }
}

/// Routes one attempt's outcome back to the job lifetime that started it.
struct AttemptCallback<R> {
    link: JobLink<R>,
    helper: Arc<DecodeHelper<R>>,
    attempt: AttemptInfo,
    kind: TierKind,
}

impl<R: Send + 'static> DataCallback for AttemptCallback<R> {
    fn on_data_ready(&self, data: Option<Payload>) -> Result<(), JobError> {
        if self.kind == TierKind::Source {
            if let Some(payload) = &data {
                if self
                    .helper
                    .cache_strategy()
                    .is_data_cacheable(self.attempt.fetcher.data_source())
                {
                    self.helper
                        .write_source_data(&self.attempt.source_key, payload);
                }
            }
        }

        match self.link.upgrade() {
            Some(job) => job.on_data_fetcher_ready(self.attempt.clone(), data),
            None => {
                debug!(key = %self.attempt.attempted_key, "Dropping data for released job");
                self.attempt.fetcher.cleanup();
                Ok(())
            }
        }
    }

    fn on_load_failed(&self, error: FetchError) -> Result<(), JobError> {
        match self.link.upgrade() {
            Some(job) => job.on_data_fetcher_failed(self.attempt.clone(), error),
            None => {
                debug!(key = %self.attempt.attempted_key, error = %error, "Dropping failure for released job");
                self.attempt.fetcher.cleanup();
                Ok(())
            }
        }
    }
}
