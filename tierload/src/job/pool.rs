//! Bounded pool of reusable job instances.

use crate::cache::ByteCache;
use crate::error::ProtocolFault;
use crate::job::callback::JobCallback;
use crate::job::resolution::{JobInner, ResolutionJob};
use crate::job::spec::RequestSpec;
use crate::registry::Registry;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Default number of idle job instances kept for reuse.
pub const DEFAULT_POOL_CAPACITY: usize = 150;

pub(crate) struct PoolShared<R> {
    free: Mutex<Vec<Arc<JobInner<R>>>>,
    capacity: usize,
    next_order: AtomicU64,
    registry: Arc<dyn Registry<R>>,
    cache: Arc<dyn ByteCache>,
}

impl<R: Send + 'static> PoolShared<R> {
    /// Returns a released instance to the free list, dropping it if the pool is full.
    pub(crate) fn recycle(&self, inner: Arc<JobInner<R>>) {
        if inner.is_active() {
            return;
        }
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(inner);
        } else {
            trace!(capacity = self.capacity, "Pool full, dropping released job");
        }
    }
}

/// Hands out [`ResolutionJob`]s, reusing released instances.
///
/// Every job obtained from the pool gets the next submission order number,
/// which breaks priority ties first-come first-served.
pub struct JobPool<R> {
    shared: Arc<PoolShared<R>>,
}

impl<R> Clone for JobPool<R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<R: Send + 'static> JobPool<R> {
    pub fn new(registry: Arc<dyn Registry<R>>, cache: Arc<dyn ByteCache>) -> Self {
        Self::with_capacity(registry, cache, DEFAULT_POOL_CAPACITY)
    }

    pub fn with_capacity(
        registry: Arc<dyn Registry<R>>,
        cache: Arc<dyn ByteCache>,
        capacity: usize,
    ) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                free: Mutex::new(Vec::with_capacity(capacity)),
                capacity,
                next_order: AtomicU64::new(0),
                registry,
                cache,
            }),
        }
    }

    /// Binds `spec` and `callback` to a pooled (or new) job instance.
    pub fn obtain(
        &self,
        spec: RequestSpec,
        callback: Arc<dyn JobCallback<R>>,
    ) -> Result<ResolutionJob<R>, ProtocolFault> {
        let order = self.shared.next_order.fetch_add(1, Ordering::SeqCst);
        let recycled = self.shared.free.lock().pop();
        let inner = recycled.unwrap_or_else(|| {
            Arc::new(JobInner::new(
                self.shared.registry.clone(),
                self.shared.cache.clone(),
                Arc::downgrade(&self.shared),
            ))
        });
        inner.init(spec, callback, order)
    }

    /// Number of released instances waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.shared.free.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoOpByteCache;
    use crate::error::{CallbackError, LoadFailed};
    use crate::job::{Model, Priority};
    use crate::registry::ComponentRegistry;
    use crate::resource::Resource;
    use crate::strategy::DataSource;

    struct Ignore;

    impl JobCallback<Resource> for Ignore {
        fn on_resource_ready(&self, _: Resource, _: DataSource) -> Result<(), CallbackError> {
            Ok(())
        }

        fn on_load_failed(&self, _: LoadFailed) -> Result<(), CallbackError> {
            Ok(())
        }

        fn reschedule(&self, _: ResolutionJob<Resource>) -> Result<(), CallbackError> {
            Ok(())
        }
    }

    fn pool(capacity: usize) -> JobPool<Resource> {
        JobPool::with_capacity(
            Arc::new(ComponentRegistry::<Resource>::new()),
            Arc::new(NoOpByteCache::new()),
            capacity,
        )
    }

    fn spec() -> RequestSpec {
        RequestSpec::new(Model::new("m")).with_priority(Priority::High)
    }

    #[test]
    fn test_obtain_assigns_increasing_order() {
        let pool = pool(4);
        let a = pool.obtain(spec(), Arc::new(Ignore)).unwrap();
        let b = pool.obtain(spec(), Arc::new(Ignore)).unwrap();
        assert!(a.order() < b.order());
        assert_eq!(a.priority(), Priority::High);
        assert!(a < b);
    }

    #[test]
    fn test_released_job_is_reused() {
        let pool = pool(4);
        let first = pool.obtain(spec(), Arc::new(Ignore)).unwrap();
        first.release(true).unwrap();
        assert_eq!(pool.idle_count(), 1);

        let second = pool.obtain(spec(), Arc::new(Ignore)).unwrap();
        assert_eq!(pool.idle_count(), 0);
        assert!(second.is_current());
        assert!(!first.is_current());
        assert!(first.release(false).is_err());
    }

    #[test]
    fn test_full_pool_drops_released_jobs() {
        let pool = pool(1);
        let a = pool.obtain(spec(), Arc::new(Ignore)).unwrap();
        let b = pool.obtain(spec(), Arc::new(Ignore)).unwrap();
        a.release(true).unwrap();
        b.release(true).unwrap();
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.capacity(), 1);
    }
}
