//! Per-request decode configuration and component lookup.

use crate::cache::ByteCache;
use crate::decode::LoadPath;
use crate::error::JobError;
use crate::job::{Model, RequestSpec};
use crate::key::{DataCacheKey, DiskKey, Key, Options, Signature};
use crate::registry::{
    LoadData, Registry, ResourceEncoder, SourceEncoder, Transformation, UnitTransformation,
};
use crate::resource::{Payload, Resource, TypeTag};
use crate::strategy::{CacheStrategy, DataSource};
use std::borrow::Cow;
use std::io::Write;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Decode option telling decoders whether they may produce output that cannot
/// be transformed afterwards. Set to `"true"` or `"false"`.
pub const ALLOW_FIXED_OUTPUT: &str = "decode.allow-fixed-output";

/// Request configuration shared by a job and its tiers.
///
/// Load data and cache keys are resolved from the registry on first use and
/// then reused for the rest of the request.
pub struct DecodeHelper<R> {
    spec: Arc<RequestSpec>,
    registry: Arc<dyn Registry<R>>,
    cache: Arc<dyn ByteCache>,
    load_data: OnceLock<Vec<LoadData>>,
    cache_keys: OnceLock<Vec<Key>>,
}

impl<R: Send + 'static> DecodeHelper<R> {
    pub fn new(
        spec: Arc<RequestSpec>,
        registry: Arc<dyn Registry<R>>,
        cache: Arc<dyn ByteCache>,
    ) -> Self {
        Self {
            spec,
            registry,
            cache,
            load_data: OnceLock::new(),
            cache_keys: OnceLock::new(),
        }
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    pub fn model(&self) -> &Model {
        self.spec.model()
    }

    pub fn signature(&self) -> &Signature {
        self.spec.signature()
    }

    pub fn width(&self) -> u32 {
        self.spec.width()
    }

    pub fn height(&self) -> u32 {
        self.spec.height()
    }

    pub fn options(&self) -> &Options {
        self.spec.options()
    }

    pub fn cache_strategy(&self) -> CacheStrategy {
        self.spec.cache_strategy()
    }

    pub fn cache(&self) -> &Arc<dyn ByteCache> {
        &self.cache
    }

    /// Name of the output type delivered to the caller.
    pub fn transcode_name(&self) -> &'static str {
        std::any::type_name::<R>()
    }

    /// Load data built by every model loader that handles the model, in registration order.
    pub fn load_data(&self) -> &[LoadData] {
        self.load_data.get_or_init(|| {
            let model = self.spec.model();
            self.registry
                .model_loaders(model)
                .iter()
                .filter_map(|loader| {
                    loader.build_load_data(model, self.width(), self.height(), self.options())
                })
                .collect()
        })
    }

    /// Source keys followed by alternate keys, without duplicates.
    pub fn cache_keys(&self) -> &[Key] {
        self.cache_keys.get_or_init(|| {
            let mut keys: Vec<Key> = Vec::new();
            for data in self.load_data() {
                if !keys.contains(data.source_key()) {
                    keys.push(data.source_key().clone());
                }
                for alternate in data.alternate_keys() {
                    if !keys.contains(alternate) {
                        keys.push(alternate.clone());
                    }
                }
            }
            keys
        })
    }

    /// Whether `key` is the primary source key of some load data.
    pub fn is_source_key(&self, key: &Key) -> bool {
        self.load_data().iter().any(|data| data.source_key() == key)
    }

    pub fn load_path(&self, data_type: TypeTag) -> Option<Arc<LoadPath<R>>> {
        self.registry.load_path(data_type, self.spec.resource_type())
    }

    pub fn has_load_path(&self, data_type: TypeTag) -> bool {
        self.load_path(data_type).is_some()
    }

    pub fn registered_resource_types(&self) -> Vec<TypeTag> {
        self.registry
            .registered_resource_types(self.spec.model(), self.spec.resource_type())
    }

    /// Transformation to apply to resources of `resource_type`.
    ///
    /// Falls back to the identity transformation unless transformations are
    /// required and none were supplied.
    pub fn transformation(&self, resource_type: TypeTag) -> Result<Arc<dyn Transformation>, JobError> {
        if let Some(transformation) = self.spec.transformation_for(resource_type) {
            return Ok(transformation);
        }
        if self.spec.transformations_empty() && self.spec.transformation_required() {
            return Err(JobError::MissingTransformation(resource_type));
        }
        Ok(Arc::new(UnitTransformation))
    }

    pub fn result_encoder(&self, resource: &Resource) -> Option<Arc<dyn ResourceEncoder>> {
        self.registry.result_encoder(resource)
    }

    pub fn source_encoder(&self, data: &Payload) -> Option<Arc<dyn SourceEncoder>> {
        self.registry.source_encoder(data)
    }

    /// Decode options for data from `data_source`.
    pub fn decode_options(&self, data_source: DataSource) -> Cow<'_, Options> {
        let fixed_output_safe = data_source == DataSource::ResourceDiskCache
            || self.spec.scale_only_or_no_transform();
        let options = self.spec.options();
        match options.get(ALLOW_FIXED_OUTPUT) {
            Some("false") => Cow::Borrowed(options),
            Some(_) if fixed_output_safe => Cow::Borrowed(options),
            _ => Cow::Owned(
                options
                    .clone()
                    .with(ALLOW_FIXED_OUTPUT, fixed_output_safe.to_string()),
            ),
        }
    }

    /// Writes a freshly fetched payload to the byte cache under its data cache key.
    ///
    /// Failures are logged; the fetched payload is still decoded.
    pub(crate) fn write_source_data(&self, source_key: &Key, data: &Payload) {
        let Some(encoder) = self.source_encoder(data) else {
            debug!(key = %source_key, data_type = %data.data_type(), "No source encoder, skipping data cache write");
            return;
        };

        let store_key = DataCacheKey::new(source_key.clone(), self.signature().clone()).store_key();
        let started = Instant::now();
        let writer = |out: &mut dyn Write| encoder.encode(data, out);

        match self.cache.put(&store_key, &writer) {
            Ok(()) => trace!(
                key = %source_key,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Wrote source data to cache"
            ),
            Err(e) => warn!(
                key = %source_key,
                error = %e,
                "Failed to write source data to cache"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryByteCache, NoOpByteCache};
    use crate::fetch::CachedBytesFetcher;
    use crate::registry::{BytesEncoder, ComponentRegistry, ModelLoader};
    use crate::strategy::EncodeStrategy;
    use bytes::Bytes;

    struct KeysLoader {
        source: &'static str,
        alternates: Vec<&'static str>,
    }

    impl ModelLoader for KeysLoader {
        fn handles(&self, _model: &Model) -> bool {
            true
        }

        fn data_type(&self) -> TypeTag {
            TypeTag::of::<Bytes>()
        }

        fn build_load_data(
            &self,
            _model: &Model,
            _width: u32,
            _height: u32,
            _options: &Options,
        ) -> Option<LoadData> {
            Some(
                LoadData::new(
                    Key::new(self.source),
                    Arc::new(CachedBytesFetcher::new(
                        Bytes::from_static(b"src"),
                        DataSource::Local,
                    )),
                )
                .with_alternate_keys(self.alternates.iter().map(|k| Key::new(*k)).collect()),
            )
        }
    }

    fn helper_with(
        spec: RequestSpec,
        registry: ComponentRegistry<Resource>,
        cache: Arc<dyn ByteCache>,
    ) -> DecodeHelper<Resource> {
        DecodeHelper::new(Arc::new(spec), Arc::new(registry), cache)
    }

    #[test]
    fn test_cache_keys_deduplicate_in_order() {
        let registry = ComponentRegistry::<Resource>::new()
            .with_model_loader(Arc::new(KeysLoader {
                source: "a",
                alternates: vec!["b", "a"],
            }))
            .with_model_loader(Arc::new(KeysLoader {
                source: "b",
                alternates: vec!["c"],
            }));
        let helper = helper_with(
            RequestSpec::new(Model::new("m")),
            registry,
            Arc::new(NoOpByteCache::new()),
        );

        let keys: Vec<&str> = helper.cache_keys().iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(helper.is_source_key(&Key::new("a")));
        assert!(helper.is_source_key(&Key::new("b")));
        assert!(!helper.is_source_key(&Key::new("c")));
    }

    #[test]
    fn test_transformation_fallback() {
        let registry = ComponentRegistry::<Resource>::new();
        let optional = helper_with(
            RequestSpec::new(Model::new("m")),
            ComponentRegistry::new(),
            Arc::new(NoOpByteCache::new()),
        );
        assert_eq!(optional.transformation(TypeTag::of::<String>()).unwrap().id(), "");

        let required = helper_with(
            RequestSpec::new(Model::new("m")).with_transformation_required(true),
            registry,
            Arc::new(NoOpByteCache::new()),
        );
        assert!(matches!(
            required.transformation(TypeTag::of::<String>()),
            Err(JobError::MissingTransformation(_))
        ));
    }

    #[test]
    fn test_decode_options_fixed_output() {
        let helper = helper_with(
            RequestSpec::new(Model::new("m")),
            ComponentRegistry::new(),
            Arc::new(NoOpByteCache::new()),
        );
        let remote = helper.decode_options(DataSource::Remote);
        assert_eq!(remote.get(ALLOW_FIXED_OUTPUT), Some("false"));
        let cached = helper.decode_options(DataSource::ResourceDiskCache);
        assert_eq!(cached.get(ALLOW_FIXED_OUTPUT), Some("true"));

        let opted_out = helper_with(
            RequestSpec::new(Model::new("m"))
                .with_options(Options::new().with(ALLOW_FIXED_OUTPUT, "false")),
            ComponentRegistry::new(),
            Arc::new(NoOpByteCache::new()),
        );
        assert!(matches!(
            opted_out.decode_options(DataSource::ResourceDiskCache),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_write_source_data_uses_data_cache_key() {
        let cache = Arc::new(MemoryByteCache::new(1024));
        let registry = ComponentRegistry::<Resource>::new()
            .with_source_encoder(TypeTag::of::<Bytes>(), Arc::new(BytesEncoder::new(EncodeStrategy::Source)));
        let helper = helper_with(
            RequestSpec::new(Model::new("m")),
            registry,
            cache.clone(),
        );

        helper.write_source_data(&Key::new("a"), &Payload::new(Bytes::from_static(b"raw")));

        let key = DataCacheKey::new(Key::new("a"), Signature::empty()).store_key();
        assert_eq!(cache.get(&key).unwrap().as_ref(), b"raw");
    }

    #[test]
    fn test_write_source_data_without_encoder_is_skipped() {
        let cache = Arc::new(MemoryByteCache::new(1024));
        let helper = helper_with(
            RequestSpec::new(Model::new("m")),
            ComponentRegistry::new(),
            cache.clone(),
        );
        helper.write_source_data(&Key::new("a"), &Payload::new(Bytes::from_static(b"raw")));
        assert_eq!(cache.entry_count(), 0);
    }
}
