//! Resolver facade: pool, executor and listener wiring.

use crate::cache::ByteCache;
use crate::config::EngineConfig;
use crate::error::{CallbackError, JobError, LoadFailed, ProtocolFault};
use crate::executor::LaneExecutor;
use crate::job::{JobCallback, JobPool, RequestSpec, ResolutionJob, Stage};
use crate::registry::Registry;
use crate::strategy::DataSource;
use std::sync::{Arc, OnceLock, Weak};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Receives the outcome of a [`Resolver::resolve`] call.
///
/// Exactly one method is called per resolved request, cancelled requests
/// included.
pub trait ResultListener<R>: Send + Sync {
    fn on_ready(&self, resource: R, data_source: DataSource) -> Result<(), CallbackError>;

    fn on_failed(&self, error: LoadFailed) -> Result<(), CallbackError>;
}

/// Adapts a listener to the job callback protocol.
///
/// Releases the job after its terminal notification and routes reschedules
/// back to the executor.
struct ListenerCallback<R: Send + 'static> {
    listener: Arc<dyn ResultListener<R>>,
    job: OnceLock<ResolutionJob<R>>,
    executor: Weak<LaneExecutor<R>>,
}

impl<R: Send + 'static> ListenerCallback<R> {
    fn release(&self) {
        if let Some(job) = self.job.get() {
            if let Err(e) = job.release(false) {
                debug!(error = %e, "Release after notification failed");
            }
        }
    }
}

impl<R: Send + 'static> JobCallback<R> for ListenerCallback<R> {
    fn on_resource_ready(&self, resource: R, data_source: DataSource) -> Result<(), CallbackError> {
        let result = self.listener.on_ready(resource, data_source);
        self.release();
        result
    }

    fn on_load_failed(&self, error: LoadFailed) -> Result<(), CallbackError> {
        let result = self.listener.on_failed(error);
        self.release();
        result
    }

    fn reschedule(&self, job: ResolutionJob<R>) -> Result<(), CallbackError> {
        let executor = self
            .executor
            .upgrade()
            .ok_or_else(|| CallbackError::new("executor has shut down"))?;
        executor.resubmit(job);
        Ok(())
    }
}

/// Entry point: resolves request specs to decoded values on a lane executor.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tierload::cache::MemoryByteCache;
/// use tierload::config::EngineConfig;
/// use tierload::registry::ComponentRegistry;
/// use tierload::resolver::Resolver;
/// use tierload::resource::Resource;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let config = EngineConfig::default();
/// let cache = Arc::new(MemoryByteCache::from_config(&config.memory_cache_config()));
/// let registry = Arc::new(ComponentRegistry::<Resource>::new());
/// let resolver = Resolver::new(config, registry, cache);
///
/// let shutdown = CancellationToken::new();
/// tokio::spawn(resolver.executor().clone().run(shutdown.clone()));
/// # }
/// ```
pub struct Resolver<R: Send + 'static> {
    pool: JobPool<R>,
    executor: Arc<LaneExecutor<R>>,
    config: EngineConfig,
}

impl<R: Send + 'static> Resolver<R> {
    pub fn new(
        config: EngineConfig,
        registry: Arc<dyn Registry<R>>,
        cache: Arc<dyn ByteCache>,
    ) -> Self {
        info!(
            pool_capacity = config.pool_capacity(),
            lanes = config.executor_lanes(),
            strategy = %config.cache_strategy(),
            "Resolver created"
        );
        Self {
            pool: JobPool::with_capacity(registry, cache, config.pool_capacity()),
            executor: Arc::new(LaneExecutor::new(config.executor_config())),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool(&self) -> &JobPool<R> {
        &self.pool
    }

    /// The executor; its `run` future must be driven for jobs to make progress.
    pub fn executor(&self) -> &Arc<LaneExecutor<R>> {
        &self.executor
    }

    /// Starts resolving `spec`. The returned handle can cancel the request.
    ///
    /// Requests without their own cache strategy get the configured default.
    pub fn resolve(
        &self,
        spec: RequestSpec,
        listener: Arc<dyn ResultListener<R>>,
    ) -> Result<ResolutionJob<R>, ProtocolFault> {
        let spec = if spec.has_cache_strategy() {
            spec
        } else {
            spec.with_cache_strategy(self.config.cache_strategy())
        };

        let callback = Arc::new(ListenerCallback {
            listener,
            job: OnceLock::new(),
            executor: Arc::downgrade(&self.executor),
        });
        let job = self.pool.obtain(spec, callback.clone())?;
        let _ = callback.job.set(job.clone());

        self.executor.submit(job.clone());
        Ok(job)
    }

    /// Cancels a request.
    ///
    /// A request that has not started running is pulled from its queue and its
    /// listener is told it failed. A running request reports the failure once
    /// it notices.
    pub fn cancel(&self, job: &ResolutionJob<R>) -> Result<(), JobError> {
        job.cancel()?;
        // A job rescheduled mid-resolution still owes its listener a failure
        let never_ran = job.stage() == Some(Stage::Initialize);
        if never_ran && self.executor.remove(job) {
            debug!(order = job.order(), "Cancelled job removed from queue");
            job.fail_unstarted()?;
        }
        Ok(())
    }

    /// Drives the executor until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        self.executor.clone().run(shutdown).await;
    }
}
