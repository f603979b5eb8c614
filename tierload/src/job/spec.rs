//! Request input: model, priority and the immutable per-request spec.

use crate::key::{Options, Signature};
use crate::registry::Transformation;
use crate::resource::TypeTag;
use crate::strategy::CacheStrategy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The thing being requested: a URL, a path, a content id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Model(String);

impl Model {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request priority. Declaration order is scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Priority {
    Immediate = 0,
    High = 1,
    #[default]
    Normal = 2,
    Low = 3,
}

impl Priority {
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Priority::Immediate,
            1 => Priority::High,
            2 => Priority::Normal,
            _ => Priority::Low,
        }
    }
}

/// Everything a job needs to know about one request.
///
/// Built with `with_*` methods; immutable once handed to a job.
///
/// # Example
///
/// ```
/// use tierload::job::{Model, Priority, RequestSpec};
/// use tierload::strategy::CacheStrategy;
///
/// let spec = RequestSpec::new(Model::new("https://example.com/a.png"))
///     .with_size(320, 240)
///     .with_priority(Priority::High)
///     .with_cache_strategy(CacheStrategy::All);
///
/// assert_eq!(spec.width(), 320);
/// assert_eq!(spec.priority(), Priority::High);
/// ```
#[derive(Clone)]
pub struct RequestSpec {
    model: Model,
    signature: Signature,
    width: u32,
    height: u32,
    resource_type: Option<TypeTag>,
    priority: Priority,
    cache_strategy: Option<CacheStrategy>,
    transformations: HashMap<TypeTag, Arc<dyn Transformation>>,
    transformation_required: bool,
    scale_only_or_no_transform: bool,
    only_from_cache: bool,
    options: Options,
}

impl RequestSpec {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            signature: Signature::empty(),
            width: 0,
            height: 0,
            resource_type: None,
            priority: Priority::default(),
            cache_strategy: None,
            transformations: HashMap::new(),
            transformation_required: false,
            scale_only_or_no_transform: true,
            only_from_cache: false,
            options: Options::new(),
        }
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Restricts decoding to a single resource type.
    pub fn with_resource_type(mut self, resource_type: TypeTag) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.cache_strategy = Some(strategy);
        self
    }

    /// Adds a transformation for resources of `resource_type`.
    pub fn with_transformation(
        mut self,
        resource_type: TypeTag,
        transformation: Arc<dyn Transformation>,
    ) -> Self {
        self.transformations.insert(resource_type, transformation);
        self.scale_only_or_no_transform = false;
        self
    }

    pub fn with_transformation_required(mut self, required: bool) -> Self {
        self.transformation_required = required;
        self
    }

    pub fn with_scale_only_or_no_transform(mut self, value: bool) -> Self {
        self.scale_only_or_no_transform = value;
        self
    }

    /// Never fall through to the source tier.
    pub fn with_only_from_cache(mut self, only_from_cache: bool) -> Self {
        self.only_from_cache = only_from_cache;
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resource_type(&self) -> Option<TypeTag> {
        self.resource_type
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// The request's strategy, or the default if none was chosen.
    pub fn cache_strategy(&self) -> CacheStrategy {
        self.cache_strategy.unwrap_or_default()
    }

    /// Whether the request chose its own cache strategy.
    pub fn has_cache_strategy(&self) -> bool {
        self.cache_strategy.is_some()
    }

    pub fn transformation_for(&self, resource_type: TypeTag) -> Option<Arc<dyn Transformation>> {
        self.transformations.get(&resource_type).cloned()
    }

    pub fn transformations_empty(&self) -> bool {
        self.transformations.is_empty()
    }

    pub fn transformation_required(&self) -> bool {
        self.transformation_required
    }

    pub fn scale_only_or_no_transform(&self) -> bool {
        self.scale_only_or_no_transform
    }

    pub fn only_from_cache(&self) -> bool {
        self.only_from_cache
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("model", &self.model)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("priority", &self.priority)
            .field("cache_strategy", &self.cache_strategy)
            .field("transformations", &self.transformations.len())
            .field("only_from_cache", &self.only_from_cache)
            .finish()
    }
}
