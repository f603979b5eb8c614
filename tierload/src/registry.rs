//! Component registry.
//!
//! The [`Registry`] trait is everything the resolution engine needs to know
//! about the components available for a request: which model loaders produce
//! data for a model, how data decodes into resources, and how resources and
//! raw data are encoded back into the byte cache. [`ComponentRegistry`] is the
//! in-process implementation, built once and shared by every job.

use crate::decode::{DecodePath, LoadPath, ResourceDecoder, ResourceTranscoder};
use crate::fetch::DataFetcher;
use crate::job::Model;
use crate::key::{Key, Options};
use crate::resource::{Payload, Resource, TypeTag};
use crate::strategy::EncodeStrategy;
use bytes::Bytes;
use dashmap::DashMap;
use std::io::{self, Write};
use std::sync::Arc;

// =============================================================================
// Load data and model loaders
// =============================================================================

/// A fetcher together with the keys its data is cached under.
#[derive(Clone)]
pub struct LoadData {
    source_key: Key,
    alternate_keys: Vec<Key>,
    fetcher: Arc<dyn DataFetcher>,
}

impl LoadData {
    pub fn new(source_key: Key, fetcher: Arc<dyn DataFetcher>) -> Self {
        Self {
            source_key,
            alternate_keys: Vec::new(),
            fetcher,
        }
    }

    /// Keys that identify the same data, checked in the data cache after the source key.
    pub fn with_alternate_keys(mut self, keys: Vec<Key>) -> Self {
        self.alternate_keys = keys;
        self
    }

    pub fn source_key(&self) -> &Key {
        &self.source_key
    }

    pub fn alternate_keys(&self) -> &[Key] {
        &self.alternate_keys
    }

    pub fn fetcher(&self) -> &Arc<dyn DataFetcher> {
        &self.fetcher
    }
}

impl std::fmt::Debug for LoadData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadData")
            .field("source_key", &self.source_key)
            .field("alternate_keys", &self.alternate_keys)
            .field("data_source", &self.fetcher.data_source())
            .finish()
    }
}

/// Builds load data for models it understands.
pub trait ModelLoader: Send + Sync {
    fn handles(&self, model: &Model) -> bool;

    /// Data type produced by this loader's fetchers.
    fn data_type(&self) -> TypeTag;

    /// Returns `None` when this loader cannot load the model after all.
    fn build_load_data(
        &self,
        model: &Model,
        width: u32,
        height: u32,
        options: &Options,
    ) -> Option<LoadData>;
}

// =============================================================================
// Transformations and encoders
// =============================================================================

/// Transformation applied to a decoded resource.
pub trait Transformation: Send + Sync {
    /// Stable identifier mixed into resource cache keys.
    fn id(&self) -> &str;

    fn transform(&self, resource: Resource, width: u32, height: u32) -> Resource;
}

/// Transformation that returns the resource unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitTransformation;

impl Transformation for UnitTransformation {
    fn id(&self) -> &str {
        ""
    }

    fn transform(&self, resource: Resource, _width: u32, _height: u32) -> Resource {
        resource
    }
}

/// Writes a decoded resource into the byte cache.
pub trait ResourceEncoder: Send + Sync {
    /// Which form of the resource this encoder persists.
    fn encode_strategy(&self) -> EncodeStrategy;

    fn encode(&self, resource: &Resource, out: &mut dyn Write) -> io::Result<()>;
}

/// Writes raw fetched data into the byte cache.
pub trait SourceEncoder: Send + Sync {
    fn encode(&self, data: &Payload, out: &mut dyn Write) -> io::Result<()>;
}

/// Encoder for [`Bytes`] payloads and resources.
#[derive(Debug, Clone, Copy)]
pub struct BytesEncoder {
    strategy: EncodeStrategy,
}

impl BytesEncoder {
    pub fn new(strategy: EncodeStrategy) -> Self {
        Self { strategy }
    }
}

fn write_bytes(value: Option<&Bytes>, out: &mut dyn Write) -> io::Result<()> {
    match value {
        Some(bytes) => out.write_all(bytes),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "value is not Bytes",
        )),
    }
}

impl ResourceEncoder for BytesEncoder {
    fn encode_strategy(&self) -> EncodeStrategy {
        self.strategy
    }

    fn encode(&self, resource: &Resource, out: &mut dyn Write) -> io::Result<()> {
        write_bytes(resource.downcast_ref::<Bytes>(), out)
    }
}

impl SourceEncoder for BytesEncoder {
    fn encode(&self, data: &Payload, out: &mut dyn Write) -> io::Result<()> {
        write_bytes(data.downcast_ref::<Bytes>(), out)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Component lookup used by the resolution engine.
pub trait Registry<R>: Send + Sync {
    /// Model loaders that handle `model`, in registration order.
    fn model_loaders(&self, model: &Model) -> Vec<Arc<dyn ModelLoader>>;

    /// Decode paths for `data_type`, optionally restricted to one resource type.
    fn load_path(
        &self,
        data_type: TypeTag,
        resource_type: Option<TypeTag>,
    ) -> Option<Arc<LoadPath<R>>>;

    /// Resource types that some loader's data can be decoded into and transcoded from.
    fn registered_resource_types(
        &self,
        model: &Model,
        resource_type: Option<TypeTag>,
    ) -> Vec<TypeTag>;

    fn result_encoder(&self, resource: &Resource) -> Option<Arc<dyn ResourceEncoder>>;

    fn source_encoder(&self, data: &Payload) -> Option<Arc<dyn SourceEncoder>>;
}

struct DecoderEntry {
    data_type: TypeTag,
    resource_type: TypeTag,
    decoder: Arc<dyn ResourceDecoder>,
}

type LoadPathKey = (TypeTag, Option<TypeTag>);

/// In-process [`Registry`] built with `with_*` methods.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bytes::Bytes;
/// use tierload::decode::IdentityTranscoder;
/// use tierload::registry::{BytesEncoder, ComponentRegistry, Registry};
/// use tierload::resource::{Resource, TypeTag};
/// use tierload::strategy::EncodeStrategy;
///
/// let registry = ComponentRegistry::<Resource>::new()
///     .with_transcoder(TypeTag::of::<Bytes>(), Arc::new(IdentityTranscoder))
///     .with_result_encoder(
///         TypeTag::of::<Bytes>(),
///         Arc::new(BytesEncoder::new(EncodeStrategy::Transformed)),
///     );
///
/// // No decoder registered yet
/// assert!(registry.load_path(TypeTag::of::<Bytes>(), None).is_none());
/// ```
pub struct ComponentRegistry<R> {
    loaders: Vec<Arc<dyn ModelLoader>>,
    decoders: Vec<DecoderEntry>,
    transcoders: Vec<(TypeTag, Arc<dyn ResourceTranscoder<R>>)>,
    result_encoders: Vec<(TypeTag, Arc<dyn ResourceEncoder>)>,
    source_encoders: Vec<(TypeTag, Arc<dyn SourceEncoder>)>,
    load_paths: DashMap<LoadPathKey, Option<Arc<LoadPath<R>>>>,
}

impl<R> Default for ComponentRegistry<R> {
    fn default() -> Self {
        Self {
            loaders: Vec::new(),
            decoders: Vec::new(),
            transcoders: Vec::new(),
            result_encoders: Vec::new(),
            source_encoders: Vec::new(),
            load_paths: DashMap::new(),
        }
    }
}

impl<R> ComponentRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Registers a decoder from `data_type` to `resource_type`. Decoders for the
    /// same pair are tried in registration order.
    pub fn with_decoder(
        mut self,
        data_type: TypeTag,
        resource_type: TypeTag,
        decoder: Arc<dyn ResourceDecoder>,
    ) -> Self {
        self.decoders.push(DecoderEntry {
            data_type,
            resource_type,
            decoder,
        });
        self.load_paths.clear();
        self
    }

    pub fn with_transcoder(
        mut self,
        resource_type: TypeTag,
        transcoder: Arc<dyn ResourceTranscoder<R>>,
    ) -> Self {
        self.transcoders.push((resource_type, transcoder));
        self.load_paths.clear();
        self
    }

    pub fn with_result_encoder(
        mut self,
        resource_type: TypeTag,
        encoder: Arc<dyn ResourceEncoder>,
    ) -> Self {
        self.result_encoders.push((resource_type, encoder));
        self
    }

    pub fn with_source_encoder(
        mut self,
        data_type: TypeTag,
        encoder: Arc<dyn SourceEncoder>,
    ) -> Self {
        self.source_encoders.push((data_type, encoder));
        self
    }

    fn transcoder(&self, resource_type: TypeTag) -> Option<&Arc<dyn ResourceTranscoder<R>>> {
        self.transcoders
            .iter()
            .find(|(rt, _)| *rt == resource_type)
            .map(|(_, t)| t)
    }

    /// Resource types decodable from `data_type` with a transcoder, in registration order.
    fn resource_types_for(&self, data_type: TypeTag, filter: Option<TypeTag>) -> Vec<TypeTag> {
        let mut types = Vec::new();
        for entry in &self.decoders {
            if entry.data_type != data_type {
                continue;
            }
            if filter.is_some_and(|f| f != entry.resource_type) {
                continue;
            }
            if self.transcoder(entry.resource_type).is_none() {
                continue;
            }
            if !types.contains(&entry.resource_type) {
                types.push(entry.resource_type);
            }
        }
        types
    }

    fn build_load_path(&self, data_type: TypeTag, filter: Option<TypeTag>) -> Option<Arc<LoadPath<R>>> {
        let paths: Vec<DecodePath<R>> = self
            .resource_types_for(data_type, filter)
            .into_iter()
            .filter_map(|resource_type| {
                let transcoder = self.transcoder(resource_type)?.clone();
                let decoders = self
                    .decoders
                    .iter()
                    .filter(|e| e.data_type == data_type && e.resource_type == resource_type)
                    .map(|e| e.decoder.clone())
                    .collect();
                Some(DecodePath::new(data_type, resource_type, decoders, transcoder))
            })
            .collect();

        if paths.is_empty() {
            None
        } else {
            Some(Arc::new(LoadPath::new(data_type, paths)))
        }
    }
}

impl<R: Send + 'static> Registry<R> for ComponentRegistry<R> {
    fn model_loaders(&self, model: &Model) -> Vec<Arc<dyn ModelLoader>> {
        self.loaders
            .iter()
            .filter(|l| l.handles(model))
            .cloned()
            .collect()
    }

    fn load_path(
        &self,
        data_type: TypeTag,
        resource_type: Option<TypeTag>,
    ) -> Option<Arc<LoadPath<R>>> {
        let key = (data_type, resource_type);
        if let Some(cached) = self.load_paths.get(&key) {
            return cached.value().clone();
        }
        let built = self.build_load_path(data_type, resource_type);
        self.load_paths.insert(key, built.clone());
        built
    }

    fn registered_resource_types(
        &self,
        model: &Model,
        resource_type: Option<TypeTag>,
    ) -> Vec<TypeTag> {
        let mut types = Vec::new();
        for loader in self.loaders.iter().filter(|l| l.handles(model)) {
            for rt in self.resource_types_for(loader.data_type(), resource_type) {
                if !types.contains(&rt) {
                    types.push(rt);
                }
            }
        }
        types
    }

    fn result_encoder(&self, resource: &Resource) -> Option<Arc<dyn ResourceEncoder>> {
        self.result_encoders
            .iter()
            .find(|(rt, _)| *rt == resource.resource_type())
            .map(|(_, e)| e.clone())
    }

    fn source_encoder(&self, data: &Payload) -> Option<Arc<dyn SourceEncoder>> {
        self.source_encoders
            .iter()
            .find(|(dt, _)| *dt == data.data_type())
            .map(|(_, e)| e.clone())
    }
}
