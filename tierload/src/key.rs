//! Cache key construction.
//!
//! A request is identified by one or more source [`Key`]s (produced by model
//! loaders) plus a [`Signature`] that invalidates stale content. From those the
//! engine derives two kinds of byte-cache keys:
//!
//! - [`DataCacheKey`]: raw source bytes, keyed by source key and signature.
//! - [`ResourceCacheKey`]: a transformed resource, additionally keyed by target
//!   dimensions, applied transformation, resource type and options.
//!
//! Both digest their fields with SHA-256 into a hex [`StoreKey`]. Every field is
//! written with a tag byte and a length prefix, so distinct field tuples never
//! produce the same byte stream.

use crate::resource::TypeTag;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a piece of source data (a URL, a file path, a content id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Version marker mixed into every cache key of a request.
///
/// Changing the signature (for example to a file's modification time)
/// makes previously cached entries unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature(String);

impl Signature {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The empty signature.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Decode options that affect the produced resource and therefore its cache key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Options(BTreeMap<String, String>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn update_digest(&self, digest: &mut Sha256) {
        write_u64(digest, b'o', self.0.len() as u64);
        // BTreeMap iteration order is stable
        for (name, value) in &self.0 {
            write_field(digest, b'n', name.as_bytes());
            write_field(digest, b'v', value.as_bytes());
        }
    }
}

/// Hex-encoded SHA-256 digest used to address the byte cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key that can be digested into a [`StoreKey`].
pub trait DiskKey {
    /// Feeds every identifying field into the digest.
    fn update_digest(&self, digest: &mut Sha256);

    /// Returns the store key for this key.
    fn store_key(&self) -> StoreKey {
        let mut digest = Sha256::new();
        self.update_digest(&mut digest);
        StoreKey(format!("{:x}", digest.finalize()))
    }
}

fn write_field(digest: &mut Sha256, tag: u8, bytes: &[u8]) {
    digest.update([tag]);
    digest.update((bytes.len() as u64).to_be_bytes());
    digest.update(bytes);
}

fn write_u64(digest: &mut Sha256, tag: u8, value: u64) {
    digest.update([tag]);
    digest.update(value.to_be_bytes());
}

// =============================================================================
// Data cache key
// =============================================================================

/// Key for raw source bytes in the byte cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataCacheKey {
    source_key: Key,
    signature: Signature,
}

impl DataCacheKey {
    pub fn new(source_key: Key, signature: Signature) -> Self {
        Self {
            source_key,
            signature,
        }
    }

    pub fn source_key(&self) -> &Key {
        &self.source_key
    }
}

impl DiskKey for DataCacheKey {
    fn update_digest(&self, digest: &mut Sha256) {
        write_field(digest, b'D', b"data");
        write_field(digest, b'k', self.source_key.as_str().as_bytes());
        write_field(digest, b's', self.signature.as_str().as_bytes());
    }
}

// =============================================================================
// Resource cache key
// =============================================================================

/// Key for a transformed resource in the byte cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCacheKey {
    source_key: Key,
    signature: Signature,
    width: u32,
    height: u32,
    transformation: String,
    resource_type: TypeTag,
    options: Options,
}

impl ResourceCacheKey {
    /// `transformation` is the id of the transformation applied to the resource;
    /// the identity transformation has an empty id.
    pub fn new(
        source_key: Key,
        signature: Signature,
        width: u32,
        height: u32,
        transformation: impl Into<String>,
        resource_type: TypeTag,
        options: Options,
    ) -> Self {
        Self {
            source_key,
            signature,
            width,
            height,
            transformation: transformation.into(),
            resource_type,
            options,
        }
    }

    pub fn source_key(&self) -> &Key {
        &self.source_key
    }
}

impl DiskKey for ResourceCacheKey {
    fn update_digest(&self, digest: &mut Sha256) {
        write_field(digest, b'R', b"resource");
        write_u64(digest, b'w', u64::from(self.width));
        write_u64(digest, b'h', u64::from(self.height));
        write_field(digest, b'k', self.source_key.as_str().as_bytes());
        write_field(digest, b's', self.signature.as_str().as_bytes());
        write_field(digest, b't', self.transformation.as_bytes());
        self.options.update_digest(digest);
        write_field(digest, b'c', self.resource_type.name().as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource_key(width: u32, transformation: &str) -> ResourceCacheKey {
        ResourceCacheKey::new(
            Key::new("https://example.com/a.png"),
            Signature::new("v1"),
            width,
            100,
            transformation,
            TypeTag::of::<String>(),
            Options::new(),
        )
    }

    #[test]
    fn test_store_key_is_stable_hex() {
        let key = DataCacheKey::new(Key::new("a"), Signature::empty());
        let first = key.store_key();
        let second = DataCacheKey::new(Key::new("a"), Signature::empty()).store_key();
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_length_prefix_prevents_field_shifting() {
        let a = DataCacheKey::new(Key::new("ab"), Signature::new("c")).store_key();
        let b = DataCacheKey::new(Key::new("a"), Signature::new("bc")).store_key();
        assert_ne!(a, b);
    }

    #[test]
    fn test_signature_changes_key() {
        let a = DataCacheKey::new(Key::new("a"), Signature::new("1")).store_key();
        let b = DataCacheKey::new(Key::new("a"), Signature::new("2")).store_key();
        assert_ne!(a, b);
    }

    #[test]
    fn test_resource_key_depends_on_dimensions_and_transformation() {
        assert_eq!(resource_key(100, "crop").store_key(), resource_key(100, "crop").store_key());
        assert_ne!(resource_key(100, "crop").store_key(), resource_key(200, "crop").store_key());
        assert_ne!(resource_key(100, "crop").store_key(), resource_key(100, "fit").store_key());
    }

    #[test]
    fn test_resource_key_depends_on_options() {
        let plain = resource_key(100, "crop");
        let mut with_option = plain.clone();
        with_option.options = Options::new().with("format", "rgb565");
        assert_ne!(plain.store_key(), with_option.store_key());
    }

    #[test]
    fn test_data_and_resource_keys_never_collide() {
        let data = DataCacheKey::new(Key::new("x"), Signature::empty()).store_key();
        let resource = ResourceCacheKey::new(
            Key::new("x"),
            Signature::empty(),
            0,
            0,
            "",
            TypeTag::of::<String>(),
            Options::new(),
        )
        .store_key();
        assert_ne!(data, resource);
    }

    #[test]
    fn test_options_accessors() {
        let mut options = Options::new().with("a", "1");
        options.set("b", "2");
        assert_eq!(options.get("a"), Some("1"));
        assert_eq!(options.get("b"), Some("2"));
        assert_eq!(options.get("c"), None);
        assert!(!options.is_empty());
    }
}
