//! A decoded resource waiting to be written back to the byte cache.

use crate::cache::{ByteCache, CacheError};
use crate::key::StoreKey;
use crate::registry::ResourceEncoder;
use crate::resource::Resource;
use std::io::Write;
use std::sync::Arc;

struct PendingEncode {
    key: StoreKey,
    encoder: Arc<dyn ResourceEncoder>,
    resource: Resource,
}

/// At most one pending cache write per job lifetime.
///
/// The plan holds its own handle to the resource, so the value stays alive
/// until the write finishes even if the caller has already dropped theirs.
#[derive(Default)]
pub struct DeferredEncodePlan {
    pending: Option<PendingEncode>,
}

impl DeferredEncodePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self, key: StoreKey, encoder: Arc<dyn ResourceEncoder>, resource: Resource) {
        self.pending = Some(PendingEncode {
            key,
            encoder,
            resource,
        });
    }

    pub fn has_resource_to_encode(&self) -> bool {
        self.pending.is_some()
    }

    /// Writes the pending resource and drops the plan's handle, whether or not
    /// the write succeeds. Does nothing when no write is pending.
    pub fn encode(&mut self, cache: &dyn ByteCache) -> Result<(), CacheError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let writer = |out: &mut dyn Write| pending.encoder.encode(&pending.resource, out);
        cache.put(&pending.key, &writer)
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
