//! Type-erased data and resource handles.
//!
//! Fetchers produce [`Payload`]s (raw data such as bytes or a file path), decoders
//! turn payloads into [`Resource`]s, and transcoders turn resources into the
//! caller's output type. Both handles are cheap to clone: cloning shares the
//! underlying value, which stays alive until the last handle is dropped.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime tag for a concrete data or resource type.
///
/// Used to look up decode paths, encoders and transformations by type.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Returns the tag for `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name. Stable within a build; used in cache keys.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Data delivered by a fetcher, tagged with its concrete type.
#[derive(Clone)]
pub struct Payload {
    value: Arc<dyn Any + Send + Sync>,
    data_type: TypeTag,
}

impl Payload {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            data_type: TypeTag::of::<T>(),
        }
    }

    pub fn data_type(&self) -> TypeTag {
        self.data_type
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("data_type", &self.data_type)
            .finish()
    }
}

// =============================================================================
// Resource
// =============================================================================

/// Shared handle to a decoded (and possibly transformed) resource.
///
/// A resource handed to the caller may also be held by a pending deferred
/// encode. Each side holds its own handle; the value is dropped only once both
/// handles are gone, so the encode can never observe a freed value.
#[derive(Clone)]
pub struct Resource {
    value: Arc<dyn Any + Send + Sync>,
    resource_type: TypeTag,
    size: usize,
}

impl Resource {
    /// Wraps a decoded value. `size` is the approximate retained size in bytes.
    pub fn new<T: Any + Send + Sync>(value: T, size: usize) -> Self {
        Self {
            value: Arc::new(value),
            resource_type: TypeTag::of::<T>(),
            size,
        }
    }

    pub fn resource_type(&self) -> TypeTag {
        self.resource_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Number of live handles sharing this resource.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.value)
    }

    /// Whether both handles refer to the same underlying value.
    pub fn same_value(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("resource_type", &self.resource_type)
            .field("size", &self.size)
            .field("handles", &self.handle_count())
            .finish()
    }
}
