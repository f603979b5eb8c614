//! Integration tests for the resolver running on the lane executor.
//!
//! These tests verify the complete asynchronous flow:
//! - Source fetches delivered from runtime threads and decoded on the lane
//! - Write-through and deferred writes feeding later requests
//! - Cancellation of queued and in-flight requests
//! - Priority ordering within a lane
//!
//! Run with: `cargo test --test executor_integration`

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tierload::cache::{MemoryByteCache, NoOpByteCache};
use tierload::config::EngineConfig;
use tierload::decode::{IdentityTranscoder, ResourceDecoder};
use tierload::error::{CallbackError, DecodeFault, FetchError, LoadFailed};
use tierload::fetch::{AsyncFetcher, CachedBytesFetcher, DataFetcher};
use tierload::job::{Model, Priority, RequestSpec};
use tierload::key::{DataCacheKey, DiskKey, Key, Options, Signature};
use tierload::registry::{
    BytesEncoder, ComponentRegistry, LoadData, ModelLoader, ResourceEncoder,
};
use tierload::resolver::{Resolver, ResultListener};
use tierload::resource::{Payload, Resource, TypeTag};
use tierload::strategy::{CacheStrategy, DataSource, EncodeStrategy};

// =============================================================================
// Test Helpers
// =============================================================================

#[derive(Debug)]
enum Outcome {
    Ready(String, DataSource),
    Failed(LoadFailed),
}

/// Forwards every outcome to a channel.
struct ChannelListener {
    tx: mpsc::UnboundedSender<Outcome>,
}

impl ChannelListener {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Outcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl ResultListener<Resource> for ChannelListener {
    fn on_ready(&self, resource: Resource, data_source: DataSource) -> Result<(), CallbackError> {
        let text = resource.downcast_ref::<String>().cloned().unwrap_or_default();
        self.tx
            .send(Outcome::Ready(text, data_source))
            .map_err(|e| CallbackError::with_source("listener channel closed", e))
    }

    fn on_failed(&self, error: LoadFailed) -> Result<(), CallbackError> {
        self.tx
            .send(Outcome::Failed(error))
            .map_err(|e| CallbackError::with_source("listener channel closed", e))
    }
}

/// Model loader that builds a fresh fetcher per request.
struct FnLoader<F>(F);

impl<F> ModelLoader for FnLoader<F>
where
    F: Fn(&Model) -> Arc<dyn DataFetcher> + Send + Sync,
{
    fn handles(&self, _model: &Model) -> bool {
        true
    }

    fn data_type(&self) -> TypeTag {
        TypeTag::of::<Bytes>()
    }

    fn build_load_data(
        &self,
        model: &Model,
        _width: u32,
        _height: u32,
        _options: &Options,
    ) -> Option<LoadData> {
        Some(LoadData::new(Key::new(model.as_str()), (self.0)(model)))
    }
}

struct Utf8Decoder;

impl ResourceDecoder for Utf8Decoder {
    fn handles(&self, data: &Payload, _options: &Options) -> bool {
        data.downcast_ref::<Bytes>().is_some()
    }

    fn decode(
        &self,
        data: &Payload,
        _width: u32,
        _height: u32,
        _options: &Options,
    ) -> Result<Option<Resource>, DecodeFault> {
        let bytes = data
            .downcast_ref::<Bytes>()
            .ok_or_else(|| DecodeFault::new("not bytes"))?;
        let text = std::str::from_utf8(bytes).map_err(|e| DecodeFault::new(e.to_string()))?;
        Ok(Some(Resource::new(text.to_string(), text.len())))
    }
}

struct StringEncoder;

impl ResourceEncoder for StringEncoder {
    fn encode_strategy(&self) -> EncodeStrategy {
        EncodeStrategy::Transformed
    }

    fn encode(&self, resource: &Resource, out: &mut dyn Write) -> io::Result<()> {
        let text = resource
            .downcast_ref::<String>()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not a string"))?;
        out.write_all(text.as_bytes())
    }
}

fn registry<F>(loader: F) -> Arc<ComponentRegistry<Resource>>
where
    F: Fn(&Model) -> Arc<dyn DataFetcher> + Send + Sync + 'static,
{
    Arc::new(
        ComponentRegistry::<Resource>::new()
            .with_model_loader(Arc::new(FnLoader(loader)))
            .with_decoder(
                TypeTag::of::<Bytes>(),
                TypeTag::of::<String>(),
                Arc::new(Utf8Decoder),
            )
            .with_transcoder(TypeTag::of::<String>(), Arc::new(IdentityTranscoder))
            .with_result_encoder(TypeTag::of::<String>(), Arc::new(StringEncoder))
            .with_source_encoder(
                TypeTag::of::<Bytes>(),
                Arc::new(BytesEncoder::new(EncodeStrategy::Source)),
            ),
    )
}

/// Async remote fetcher that returns `body` and counts its fetches.
fn remote(handle: &Handle, body: &'static str, fetches: Arc<AtomicUsize>) -> Arc<dyn DataFetcher> {
    Arc::new(AsyncFetcher::new(
        handle.clone(),
        DataSource::Remote,
        move || {
            let fetches = fetches.clone();
            async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, FetchError>(Bytes::from_static(body.as_bytes()))
            }
        },
    ))
}

fn config(lanes: usize) -> EngineConfig {
    EngineConfig::default().with_executor_lanes(lanes)
}

async fn next_outcome(rx: &mut mpsc::UnboundedReceiver<Outcome>) -> Outcome {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for outcome")
        .expect("listener channel closed")
}

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_source_result_then_resource_cache_hit() {
    let handle = Handle::current();
    let fetches = Arc::new(AtomicUsize::new(0));
    let fetch_count = fetches.clone();
    let cache = Arc::new(MemoryByteCache::new(1024 * 1024));
    let resolver = Resolver::<Resource>::new(
        config(2).with_cache_strategy(CacheStrategy::All),
        registry(move |_| remote(&handle, "hello", fetches.clone())),
        cache.clone(),
    );
    let shutdown = CancellationToken::new();
    let executor = tokio::spawn(resolver.executor().clone().run(shutdown.clone()));
    let (listener, mut rx) = ChannelListener::new();

    // No strategy on the request: the configured one applies
    let spec = RequestSpec::new(Model::new("tile")).with_size(8, 8);
    resolver.resolve(spec.clone(), listener.clone()).unwrap();

    match next_outcome(&mut rx).await {
        Outcome::Ready(text, source) => {
            assert_eq!(text, "hello");
            assert_eq!(source, DataSource::Remote);
        }
        Outcome::Failed(e) => panic!("unexpected failure: {}", e),
    }

    // The deferred write finishes before the job returns to the pool
    wait_until(|| resolver.pool().idle_count() == 1).await;
    let data_key = DataCacheKey::new(Key::new("tile"), Signature::empty()).store_key();
    assert!(cache.contains(&data_key));
    assert_eq!(cache.entry_count(), 2);

    resolver.resolve(spec, listener).unwrap();
    match next_outcome(&mut rx).await {
        Outcome::Ready(text, source) => {
            assert_eq!(text, "hello");
            assert_eq!(source, DataSource::ResourceDiskCache);
        }
        Outcome::Failed(e) => panic!("unexpected failure: {}", e),
    }
    assert_eq!(fetch_count.load(Ordering::SeqCst), 1);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(2), executor)
        .await
        .expect("executor did not stop")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_source_reports_fetch_fault() {
    let handle = Handle::current();
    let resolver = Resolver::<Resource>::new(
        config(1),
        registry(move |_| {
            Arc::new(AsyncFetcher::new(handle.clone(), DataSource::Remote, || async {
                Err::<Bytes, _>(FetchError::failed("503"))
            })) as Arc<dyn DataFetcher>
        }),
        Arc::new(NoOpByteCache::new()),
    );
    let shutdown = CancellationToken::new();
    let executor = tokio::spawn(resolver.executor().clone().run(shutdown.clone()));
    let (listener, mut rx) = ChannelListener::new();

    resolver
        .resolve(RequestSpec::new(Model::new("missing")), listener)
        .unwrap();

    match next_outcome(&mut rx).await {
        Outcome::Failed(error) => {
            let faults: Vec<_> = error.fetch_faults().collect();
            assert_eq!(faults.len(), 1);
            assert_eq!(faults[0].key.as_str(), "missing");
            assert_eq!(faults[0].cause.to_string(), "503");
        }
        Outcome::Ready(text, _) => panic!("unexpected result: {}", text),
    }
    wait_until(|| resolver.pool().idle_count() == 1).await;

    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(2), executor).await;
}

#[tokio::test]
async fn test_cancel_queued_request_reports_failure() {
    let handle = Handle::current();
    let fetches = Arc::new(AtomicUsize::new(0));
    let fetch_count = fetches.clone();
    let resolver = Resolver::<Resource>::new(
        config(1),
        registry(move |_| remote(&handle, "unused", fetches.clone())),
        Arc::new(NoOpByteCache::new()),
    );
    let (listener, mut rx) = ChannelListener::new();

    // Executor is not running, so the job stays queued
    let job = resolver
        .resolve(RequestSpec::new(Model::new("tile")), listener)
        .unwrap();
    assert_eq!(resolver.executor().queued(), 1);

    resolver.cancel(&job).unwrap();

    match rx.try_recv() {
        Ok(Outcome::Failed(error)) => assert!(error.causes().is_empty()),
        Ok(Outcome::Ready(text, _)) => panic!("cancelled request resolved to {}", text),
        Err(e) => panic!("listener was not told about the cancel: {:?}", e),
    }
    assert!(rx.try_recv().is_err());
    assert_eq!(resolver.executor().queued(), 0);
    assert_eq!(resolver.pool().idle_count(), 1);
    assert!(!job.is_current());
    assert_eq!(fetch_count.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_in_flight_request_reports_failure() {
    let handle = Handle::current();
    let (started_tx, mut started_rx) = mpsc::unbounded_channel::<()>();
    let resolver = Resolver::<Resource>::new(
        config(1),
        registry(move |_| {
            let started = started_tx.clone();
            Arc::new(AsyncFetcher::new(
                handle.clone(),
                DataSource::Remote,
                move || {
                    let started = started.clone();
                    async move {
                        let _ = started.send(());
                        std::future::pending::<Result<Bytes, FetchError>>().await
                    }
                },
            )) as Arc<dyn DataFetcher>
        }),
        Arc::new(NoOpByteCache::new()),
    );
    let shutdown = CancellationToken::new();
    let executor = tokio::spawn(resolver.executor().clone().run(shutdown.clone()));
    let (listener, mut rx) = ChannelListener::new();

    let job = resolver
        .resolve(
            RequestSpec::new(Model::new("slow")).with_cache_strategy(CacheStrategy::None),
            listener,
        )
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), started_rx.recv())
        .await
        .expect("fetch never started");
    resolver.cancel(&job).unwrap();

    match next_outcome(&mut rx).await {
        Outcome::Failed(error) => {
            let faults: Vec<_> = error.fetch_faults().collect();
            assert_eq!(faults.len(), 1);
            assert!(matches!(faults[0].cause, FetchError::Cancelled));
        }
        Outcome::Ready(text, _) => panic!("cancelled request resolved to {}", text),
    }
    wait_until(|| resolver.pool().idle_count() == 1).await;
    assert!(rx.try_recv().is_err());

    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(2), executor).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_lane_runs_by_priority() {
    let resolver = Resolver::<Resource>::new(
        config(1).with_cache_strategy(CacheStrategy::None),
        registry(|model| {
            Arc::new(CachedBytesFetcher::new(
                Bytes::from(model.as_str().to_string()),
                DataSource::Local,
            )) as Arc<dyn DataFetcher>
        }),
        Arc::new(NoOpByteCache::new()),
    );
    let (listener, mut rx) = ChannelListener::new();

    for (name, priority) in [
        ("low", Priority::Low),
        ("normal", Priority::Normal),
        ("immediate", Priority::Immediate),
    ] {
        resolver
            .resolve(
                RequestSpec::new(Model::new(name)).with_priority(priority),
                listener.clone(),
            )
            .unwrap();
    }

    let shutdown = CancellationToken::new();
    let executor = tokio::spawn(resolver.executor().clone().run(shutdown.clone()));

    let mut completed = Vec::new();
    for _ in 0..3 {
        match next_outcome(&mut rx).await {
            Outcome::Ready(text, source) => {
                assert_eq!(source, DataSource::Local);
                completed.push(text);
            }
            Outcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }
    assert_eq!(completed, vec!["immediate", "normal", "low"]);

    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(2), executor).await;
}
