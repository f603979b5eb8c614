//! The resolution job: walks cache tiers, decodes, notifies, encodes.

use crate::affinity::AffinityGroup;
use crate::cache::ByteCache;
use crate::decode::{DecodeHelper, PathError};
use crate::error::{DecodeFault, Fault, FetchError, FetchFault, JobError, LoadFailed, ProtocolFault};
use crate::fetch::FetchContext;
use crate::job::callback::JobCallback;
use crate::job::deferred::DeferredEncodePlan;
use crate::job::gate::LifecycleGate;
use crate::job::pool::PoolShared;
use crate::job::spec::{Priority, RequestSpec};
use crate::job::stage::{RunReason, Stage};
use crate::job::tier::{AttemptInfo, TierGenerator};
use crate::key::{DataCacheKey, DiskKey, Key, ResourceCacheKey};
use crate::registry::Registry;
use crate::resource::{Payload, Resource};
use crate::strategy::{DataSource, EncodeStrategy};
use parking_lot::Mutex;
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Data handed over by a tier, waiting to be decoded.
pub(crate) struct RetrievedData {
    attempt: AttemptInfo,
    data: Option<Payload>,
}

struct JobState<R> {
    spec: Option<Arc<RequestSpec>>,
    helper: Option<Arc<DecodeHelper<R>>>,
    callback: Option<Arc<dyn JobCallback<R>>>,
    stage: Option<Stage>,
    run_reason: Option<RunReason>,
    owner: Option<AffinityGroup>,
    generator: Option<Arc<TierGenerator<R>>>,
    retrieved: Option<RetrievedData>,
    faults: Vec<Fault>,
    fetch_started: Option<Instant>,
}

impl<R> Default for JobState<R> {
    fn default() -> Self {
        Self {
            spec: None,
            helper: None,
            callback: None,
            stage: None,
            run_reason: None,
            owner: None,
            generator: None,
            retrieved: None,
            faults: Vec::new(),
            fetch_started: None,
        }
    }
}

/// Pooled job storage shared by every handle issued for it.
pub(crate) struct JobInner<R> {
    state: Mutex<JobState<R>>,
    gate: LifecycleGate,
    deferred: Mutex<DeferredEncodePlan>,
    cancelled: AtomicBool,
    notified: AtomicBool,
    active: AtomicBool,
    generation: AtomicU64,
    priority: AtomicU8,
    order: AtomicU64,
    cancellation: Mutex<CancellationToken>,
    registry: Arc<dyn Registry<R>>,
    cache: Arc<dyn ByteCache>,
    pool: Weak<PoolShared<R>>,
}

impl<R: Send + 'static> JobInner<R> {
    pub(crate) fn new(
        registry: Arc<dyn Registry<R>>,
        cache: Arc<dyn ByteCache>,
        pool: Weak<PoolShared<R>>,
    ) -> Self {
        Self {
            state: Mutex::new(JobState::default()),
            gate: LifecycleGate::new(),
            deferred: Mutex::new(DeferredEncodePlan::new()),
            cancelled: AtomicBool::new(false),
            notified: AtomicBool::new(false),
            active: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            priority: AtomicU8::new(Priority::default().as_u8()),
            order: AtomicU64::new(0),
            cancellation: Mutex::new(CancellationToken::new()),
            registry,
            cache,
            pool,
        }
    }

    /// Binds a request to this instance and issues a handle for the new lifetime.
    pub(crate) fn init(
        self: &Arc<Self>,
        spec: RequestSpec,
        callback: Arc<dyn JobCallback<R>>,
        order: u64,
    ) -> Result<ResolutionJob<R>, ProtocolFault> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(ProtocolFault::AlreadyActive);
        }

        let spec = Arc::new(spec);
        let helper = Arc::new(DecodeHelper::new(
            spec.clone(),
            self.registry.clone(),
            self.cache.clone(),
        ));

        self.priority.store(spec.priority().as_u8(), Ordering::SeqCst);
        self.order.store(order, Ordering::SeqCst);
        self.cancelled.store(false, Ordering::SeqCst);
        self.notified.store(false, Ordering::SeqCst);
        *self.cancellation.lock() = CancellationToken::new();
        *self.state.lock() = JobState {
            spec: Some(spec),
            helper: Some(helper),
            callback: Some(callback),
            stage: Some(Stage::Initialize),
            run_reason: Some(RunReason::Initialize),
            ..JobState::default()
        };

        trace!(order, "Job initialized");
        Ok(ResolutionJob {
            inner: self.clone(),
            generation: self.generation.load(Ordering::SeqCst),
        })
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Weak reference from a fetch attempt back to the job lifetime that started it.
pub(crate) struct JobLink<R> {
    inner: Weak<JobInner<R>>,
    generation: u64,
}

impl<R> Clone for JobLink<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            generation: self.generation,
        }
    }
}

impl<R> JobLink<R> {
    /// The job, if it is still in the lifetime this link was created for.
    pub(crate) fn upgrade(&self) -> Option<ResolutionJob<R>> {
        let inner = self.inner.upgrade()?;
        if inner.generation.load(Ordering::SeqCst) != self.generation
            || !inner.active.load(Ordering::SeqCst)
        {
            return None;
        }
        Some(ResolutionJob {
            inner,
            generation: self.generation,
        })
    }
}

/// Handle to one lifetime of a pooled resolution job.
///
/// Handles are cheap to clone. Once the job completes and returns to its pool,
/// every handle issued for that lifetime is stale: its lifecycle operations
/// fail with [`ProtocolFault::UseAfterRelease`].
///
/// Jobs order by priority (most urgent first), then by submission order
/// (earliest first), so a min-first queue runs them in the right order.
pub struct ResolutionJob<R> {
    inner: Arc<JobInner<R>>,
    generation: u64,
}

impl<R> Clone for ResolutionJob<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            generation: self.generation,
        }
    }
}

impl<R: Send + 'static> ResolutionJob<R> {
    // =========================================================================
    // Public operations
    // =========================================================================

    /// Runs the job for its current run reason inside `affinity`'s scope.
    ///
    /// Callback errors always propagate. Any other error is recorded and
    /// reported as a load failure (unless the job is already encoding), then
    /// propagated, or absorbed if the job was cancelled.
    pub fn run(&self, affinity: AffinityGroup) -> Result<(), JobError> {
        self.check()?;
        let _scope = affinity.enter();
        trace!(order = self.order(), affinity = %affinity, "Running job");

        let outcome = if self.is_cancelled() {
            let leftover = self.inner.state.lock().retrieved.take();
            if let Some(retrieved) = leftover {
                retrieved.attempt.fetcher.cleanup();
            }
            self.notify_failed()
        } else {
            self.run_wrapped()
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(err) if err.is_callback() => Err(err),
            Err(err) => self.recover(err),
        }
    }

    /// Cancels the job. Safe to call from any thread.
    ///
    /// Interrupts the active tier's fetcher; the job reports a failure the next
    /// time it gets to run.
    pub fn cancel(&self) -> Result<(), ProtocolFault> {
        self.check()?;
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let token = self.inner.cancellation.lock().clone();
        token.cancel();

        let generator = self.inner.state.lock().generator.clone();
        if let Some(generator) = generator {
            generator.cancel();
        }
        debug!(order = self.order(), "Job cancelled");
        Ok(())
    }

    /// Owner-side release. `removed_from_queue` means the job will never run.
    pub fn release(&self, removed_from_queue: bool) -> Result<(), ProtocolFault> {
        self.check()?;
        if self.inner.gate.release(removed_from_queue) {
            self.release_internal();
        }
        Ok(())
    }

    /// Asks the owner to run the job again to resume tier iteration.
    pub fn reschedule(&self) -> Result<(), JobError> {
        self.check()?;
        self.reschedule_with(RunReason::SwitchToSource)
    }

    /// Whether the first stage reads from the byte cache.
    pub fn will_decode_from_cache(&self) -> Result<bool, ProtocolFault> {
        self.check()?;
        let spec = self.inner.state.lock().spec.clone().ok_or_else(|| self.stale())?;
        let first = Stage::Initialize.next(spec.cache_strategy(), spec.only_from_cache())?;
        Ok(first.is_cache_tier())
    }

    pub fn priority(&self) -> Priority {
        Priority::from_u8(self.inner.priority.load(Ordering::SeqCst))
    }

    /// Submission order assigned when the job was obtained.
    pub fn order(&self) -> u64 {
        self.inner.order.load(Ordering::SeqCst)
    }

    /// Affinity group currently iterating the job's tiers.
    pub fn affinity(&self) -> Option<AffinityGroup> {
        self.inner.state.lock().owner
    }

    pub fn stage(&self) -> Option<Stage> {
        self.inner.state.lock().stage
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Whether this handle still refers to the job's current lifetime.
    pub fn is_current(&self) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == self.generation
    }

    /// Whether both handles refer to the same job lifetime.
    pub fn same_job(&self, other: &ResolutionJob<R>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) && self.generation == other.generation
    }

    // =========================================================================
    // Tier callbacks
    // =========================================================================

    /// A tier's fetcher produced data (or finished without any).
    pub(crate) fn on_data_fetcher_ready(
        &self,
        attempt: AttemptInfo,
        data: Option<Payload>,
    ) -> Result<(), JobError> {
        let (owner, previous) = {
            let mut state = self.inner.state.lock();
            let previous = state.retrieved.replace(RetrievedData { attempt, data });
            (state.owner, previous)
        };
        if let Some(previous) = previous {
            previous.attempt.fetcher.cleanup();
        }

        if in_owner_scope(owner) {
            self.decode_from_retrieved()
        } else {
            self.reschedule_with(RunReason::DecodeRetrieved)
        }
    }

    /// A tier's fetcher failed.
    pub(crate) fn on_data_fetcher_failed(
        &self,
        attempt: AttemptInfo,
        error: FetchError,
    ) -> Result<(), JobError> {
        attempt.fetcher.cleanup();
        let fault = FetchFault {
            key: attempt.attempted_key,
            data_source: attempt.data_source,
            data_type: attempt.fetcher.data_type(),
            cause: error,
        };
        debug!(
            order = self.order(),
            key = %fault.key,
            data_source = %fault.data_source,
            error = %fault.cause,
            "Fetching data failed"
        );

        let owner = {
            let mut state = self.inner.state.lock();
            state.faults.push(Fault::Fetch(fault));
            state.owner
        };

        if in_owner_scope(owner) {
            self.run_generators()
        } else {
            self.reschedule_with(RunReason::SwitchToSource)
        }
    }

    // =========================================================================
    // State machine
    // =========================================================================

    fn run_wrapped(&self) -> Result<(), JobError> {
        let (reason, helper) = {
            let state = self.inner.state.lock();
            (state.run_reason, state.helper.clone())
        };

        match reason {
            Some(RunReason::Initialize) => {
                let helper = helper.ok_or_else(|| self.stale())?;
                let first = Stage::Initialize
                    .next(helper.cache_strategy(), helper.spec().only_from_cache())?;
                let generator = self.build_generator(first, &helper)?;
                {
                    let mut state = self.inner.state.lock();
                    state.stage = Some(first);
                    state.generator = generator;
                }
                debug!(order = self.order(), stage = %first, model = %helper.model(), "Starting resolution");
                self.run_generators()
            }
            Some(RunReason::SwitchToSource) => self.run_generators(),
            Some(RunReason::DecodeRetrieved) => self.decode_from_retrieved(),
            None => Err(ProtocolFault::UnrecognizedRunReason.into()),
        }
    }

    fn build_generator(
        &self,
        stage: Stage,
        helper: &Arc<DecodeHelper<R>>,
    ) -> Result<Option<Arc<TierGenerator<R>>>, JobError> {
        let token = self.inner.cancellation.lock().clone();
        let context = FetchContext::new(self.priority(), token);
        let link = self.link();
        let helper = helper.clone();

        let generator = match stage {
            Stage::ResourceCache => TierGenerator::resource_cache(helper, link, context),
            Stage::DataCache => TierGenerator::data_cache(helper, link, context),
            Stage::Source => TierGenerator::source(helper, link, context),
            Stage::Finished => return Ok(None),
            other => return Err(ProtocolFault::UnrecognizedStage(Some(other)).into()),
        };
        Ok(Some(Arc::new(generator)))
    }

    fn run_generators(&self) -> Result<(), JobError> {
        let helper = {
            let mut state = self.inner.state.lock();
            state.owner = AffinityGroup::current();
            state.fetch_started = Some(Instant::now());
            state.helper.clone()
        }
        .ok_or_else(|| self.stale())?;
        let strategy = helper.cache_strategy();
        let only_from_cache = helper.spec().only_from_cache();

        let mut started = false;
        while !self.is_cancelled() {
            let generator = self.inner.state.lock().generator.clone();
            let Some(generator) = generator else {
                break;
            };

            started = generator.start_next()?;
            if started {
                break;
            }

            let current = self.inner.state.lock().stage.ok_or_else(|| self.stale())?;
            let next = current.next(strategy, only_from_cache)?;
            let next_generator = self.build_generator(next, &helper)?;
            {
                let mut state = self.inner.state.lock();
                state.stage = Some(next);
                state.generator = next_generator;
            }
            debug!(order = self.order(), from = %current, to = %next, "Advancing stage");

            if next == Stage::Source {
                return self.reschedule_with(RunReason::SwitchToSource);
            }
        }

        if !started {
            let finished = self.inner.state.lock().stage == Some(Stage::Finished);
            if finished || self.is_cancelled() {
                self.notify_failed()?;
            }
        }
        Ok(())
    }

    fn reschedule_with(&self, reason: RunReason) -> Result<(), JobError> {
        let callback = {
            let mut state = self.inner.state.lock();
            state.run_reason = Some(reason);
            state.callback.clone()
        }
        .ok_or_else(|| self.stale())?;

        trace!(order = self.order(), reason = ?reason, "Rescheduling job");
        callback.reschedule(self.clone())?;
        Ok(())
    }

    // =========================================================================
    // Decode
    // =========================================================================

    fn decode_from_retrieved(&self) -> Result<(), JobError> {
        let (retrieved, helper, fetch_started) = {
            let mut state = self.inner.state.lock();
            (state.retrieved.take(), state.helper.clone(), state.fetch_started)
        };
        let retrieved = retrieved.ok_or(ProtocolFault::MissingRetrievedData)?;
        let Some(helper) = helper else {
            retrieved.attempt.fetcher.cleanup();
            return Err(self.stale().into());
        };

        let data_source = retrieved.attempt.data_source;
        trace!(
            order = self.order(),
            key = %retrieved.attempt.source_key,
            data_source = %data_source,
            elapsed_ms = fetch_started.map(elapsed_ms).unwrap_or(0),
            "Retrieved data"
        );

        let decode_started = Instant::now();
        let result = self.decode_from_data(&helper, &retrieved);
        retrieved.attempt.fetcher.cleanup();

        match result {
            Ok(Some(resource)) => {
                trace!(
                    order = self.order(),
                    elapsed_ms = elapsed_ms(decode_started),
                    "Decoded result"
                );
                self.notify_encode_and_release(resource, data_source)
            }
            Ok(None) => self.run_generators(),
            Err(PathError::Exhausted(fault)) => {
                // A plan made before a later path step failed must not outlive it
                self.inner.deferred.lock().clear();
                let fault = fault.with_details(retrieved.attempt.attempted_key.clone(), data_source);
                debug!(order = self.order(), error = %fault, "Decode failed");
                self.inner.state.lock().faults.push(Fault::Decode(fault));
                self.run_generators()
            }
            Err(PathError::Fatal(err)) => {
                self.inner.deferred.lock().clear();
                Err(err)
            }
        }
    }

    fn decode_from_data(
        &self,
        helper: &DecodeHelper<R>,
        retrieved: &RetrievedData,
    ) -> Result<Option<R>, PathError> {
        let Some(data) = retrieved.data.as_ref() else {
            return Ok(None);
        };
        let Some(load_path) = helper.load_path(data.data_type()) else {
            return Err(PathError::Exhausted(DecodeFault::new(format!(
                "No load path for {}",
                data.data_type()
            ))));
        };

        let data_source = retrieved.attempt.data_source;
        let source_key = &retrieved.attempt.source_key;
        let options = helper.decode_options(data_source);
        let mut on_decoded =
            |decoded: Resource| self.on_resource_decoded(helper, data_source, source_key, decoded);

        load_path
            .load(data, helper.width(), helper.height(), &options, &mut on_decoded)
            .map(Some)
    }

    /// Transforms a decoded resource and plans its cache write.
    fn on_resource_decoded(
        &self,
        helper: &DecodeHelper<R>,
        data_source: DataSource,
        source_key: &Key,
        decoded: Resource,
    ) -> Result<Resource, JobError> {
        let resource_type = decoded.resource_type();

        // Resource cache hits were transformed before they were written
        let (transformed, transformation_id) = if data_source != DataSource::ResourceDiskCache {
            let transformation = helper.transformation(resource_type)?;
            let id = transformation.id().to_string();
            (
                transformation.transform(decoded, helper.width(), helper.height()),
                id,
            )
        } else {
            (decoded, String::new())
        };

        let encoder = helper.result_encoder(&transformed);
        let encode_strategy = encoder
            .as_ref()
            .map(|e| e.encode_strategy())
            .unwrap_or(EncodeStrategy::None);
        let is_from_alternate_key = !helper.is_source_key(source_key);

        if !helper
            .cache_strategy()
            .is_resource_cacheable(is_from_alternate_key, data_source, encode_strategy)
        {
            return Ok(transformed);
        }

        let encoder = encoder.ok_or(JobError::NoResultEncoder(transformed.resource_type()))?;
        let store_key = match encode_strategy {
            EncodeStrategy::Source => {
                DataCacheKey::new(source_key.clone(), helper.signature().clone()).store_key()
            }
            EncodeStrategy::Transformed => ResourceCacheKey::new(
                source_key.clone(),
                helper.signature().clone(),
                helper.width(),
                helper.height(),
                transformation_id,
                resource_type,
                helper.options().clone(),
            )
            .store_key(),
            EncodeStrategy::None => {
                return Err(ProtocolFault::UnsupportedEncodeStrategy(encode_strategy).into())
            }
        };

        trace!(
            order = self.order(),
            key = %source_key,
            strategy = %encode_strategy,
            "Deferring cache write"
        );
        self.inner
            .deferred
            .lock()
            .init(store_key, encoder, transformed.clone());
        Ok(transformed)
    }

    // =========================================================================
    // Notification and teardown
    // =========================================================================

    fn notify_encode_and_release(&self, resource: R, data_source: DataSource) -> Result<(), JobError> {
        if let Err(err) = self.notify_complete(resource, data_source) {
            if !err.is_callback() {
                return Err(err);
            }
            // The listener rejected the result: drop the write and still tear down
            self.inner.state.lock().stage = Some(Stage::Encode);
            self.inner.deferred.lock().clear();
            if self.inner.gate.mark_encode_complete() {
                self.release_internal();
            }
            return Err(err);
        }
        self.inner.state.lock().stage = Some(Stage::Encode);

        let mut plan = std::mem::take(&mut *self.inner.deferred.lock());
        let encoded = if plan.has_resource_to_encode() {
            let started = Instant::now();
            let result = plan.encode(self.inner.cache.as_ref());
            trace!(
                order = self.order(),
                elapsed_ms = elapsed_ms(started),
                ok = result.is_ok(),
                "Deferred cache write finished"
            );
            result
        } else {
            Ok(())
        };

        // The plan is spent either way, so the job may be torn down
        if self.inner.gate.mark_encode_complete() {
            self.release_internal();
        }
        encoded.map_err(JobError::from)
    }

    fn notify_complete(&self, resource: R, data_source: DataSource) -> Result<(), JobError> {
        self.set_notified()?;
        let callback = self.callback()?;
        debug!(order = self.order(), data_source = %data_source, "Resource ready");
        callback.on_resource_ready(resource, data_source)?;
        Ok(())
    }

    fn notify_failed(&self) -> Result<(), JobError> {
        self.set_notified()?;
        let (callback, faults) = {
            let state = self.inner.state.lock();
            (state.callback.clone(), state.faults.clone())
        };
        let callback = callback.ok_or_else(|| self.stale())?;

        debug!(order = self.order(), faults = faults.len(), "Load failed");
        let delivered = callback.on_load_failed(LoadFailed::new("Failed to load resource", faults));

        if self.inner.gate.mark_failed() {
            self.release_internal();
        }
        delivered.map_err(JobError::from)
    }

    /// Delivers the failure of a cancelled job that was pulled from its queue
    /// before it ever ran.
    pub(crate) fn fail_unstarted(&self) -> Result<(), JobError> {
        self.check()?;
        self.notify_failed()
    }

    fn set_notified(&self) -> Result<(), ProtocolFault> {
        if self.inner.notified.swap(true, Ordering::SeqCst) {
            let last_cause = self.inner.state.lock().faults.last().cloned();
            return Err(ProtocolFault::AlreadyNotified { last_cause });
        }
        Ok(())
    }

    /// Handles a non-callback run error.
    fn recover(&self, err: JobError) -> Result<(), JobError> {
        if !self.is_current() {
            return Err(err);
        }
        let cancelled = self.is_cancelled();
        let stage = self.inner.state.lock().stage;

        if stage != Some(Stage::Encode) {
            self.inner
                .state
                .lock()
                .faults
                .push(Fault::Unexpected(err.to_string()));
            if let Err(notify_err) = self.notify_failed() {
                if notify_err.is_callback() || !cancelled {
                    return Err(notify_err);
                }
                debug!(order = self.order(), error = %notify_err, "Ignoring notification error for cancelled job");
            }
        }

        if cancelled {
            debug!(order = self.order(), error = %err, "Ignoring run error for cancelled job");
            Ok(())
        } else {
            Err(err)
        }
    }

    /// Clears every per-request field and returns the instance to its pool.
    fn release_internal(&self) {
        let order = self.order();
        let leftover = {
            let mut state = self.inner.state.lock();
            let retrieved = state.retrieved.take();
            *state = JobState::default();
            retrieved
        };
        if let Some(retrieved) = leftover {
            retrieved.attempt.fetcher.cleanup();
        }

        self.inner.deferred.lock().clear();
        self.inner.gate.reset();
        self.inner.notified.store(false, Ordering::SeqCst);
        self.inner.cancelled.store(false, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.active.store(false, Ordering::SeqCst);
        debug!(order, "Job released");

        if let Some(pool) = self.inner.pool.upgrade() {
            pool.recycle(self.inner.clone());
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn check(&self) -> Result<(), ProtocolFault> {
        if self.is_current() {
            Ok(())
        } else {
            Err(self.stale())
        }
    }

    fn stale(&self) -> ProtocolFault {
        ProtocolFault::UseAfterRelease {
            handle: self.generation,
            current: self.inner.generation.load(Ordering::SeqCst),
        }
    }

    fn link(&self) -> JobLink<R> {
        JobLink {
            inner: Arc::downgrade(&self.inner),
            generation: self.generation,
        }
    }

    fn callback(&self) -> Result<Arc<dyn JobCallback<R>>, ProtocolFault> {
        self.inner
            .state
            .lock()
            .callback
            .clone()
            .ok_or_else(|| self.stale())
    }
}

fn in_owner_scope(owner: Option<AffinityGroup>) -> bool {
    matches!((AffinityGroup::current(), owner), (Some(current), Some(owner)) if current == owner)
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

impl<R: Send + 'static> PartialEq for ResolutionJob<R> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl<R: Send + 'static> Eq for ResolutionJob<R> {}

impl<R: Send + 'static> PartialOrd for ResolutionJob<R> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<R: Send + 'static> Ord for ResolutionJob<R> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority()
            .cmp(&other.priority())
            .then_with(|| self.order().cmp(&other.order()))
    }
}

impl<R: Send + 'static> fmt::Debug for ResolutionJob<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionJob")
            .field("order", &self.order())
            .field("priority", &self.priority())
            .field("generation", &self.generation)
            .field("current", &self.is_current())
            .finish()
    }
}
