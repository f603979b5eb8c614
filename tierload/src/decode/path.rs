//! Decode paths: data → resource → transcoded output.

use crate::error::{DecodeFault, JobError};
use crate::key::Options;
use crate::resource::{Payload, Resource, TypeTag};
use std::sync::Arc;

/// Turns a payload into a decoded resource.
pub trait ResourceDecoder: Send + Sync {
    /// Whether this decoder can attempt the payload with the given options.
    fn handles(&self, data: &Payload, options: &Options) -> bool;

    /// Decodes the payload. `Ok(None)` means the decoder declined after inspecting it.
    fn decode(
        &self,
        data: &Payload,
        width: u32,
        height: u32,
        options: &Options,
    ) -> Result<Option<Resource>, DecodeFault>;
}

/// Converts a decoded, transformed resource into the caller's output type.
pub trait ResourceTranscoder<R>: Send + Sync {
    fn transcode(&self, resource: Resource, options: &Options) -> Result<R, DecodeFault>;
}

/// Transcoder that hands the resource handle itself to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranscoder;

impl ResourceTranscoder<Resource> for IdentityTranscoder {
    fn transcode(&self, resource: Resource, _options: &Options) -> Result<Resource, DecodeFault> {
        Ok(resource)
    }
}

/// Outcome of a failed decode attempt.
#[derive(Debug)]
pub(crate) enum PathError {
    /// Every candidate failed; recorded and the next tier is tried.
    Exhausted(DecodeFault),
    /// The decode hook failed; aborts the run.
    Fatal(JobError),
}

/// Hook applied to every successfully decoded resource before transcoding.
pub(crate) type DecodedHook<'a> = dyn FnMut(Resource) -> Result<Resource, JobError> + 'a;

/// One candidate route from a data type to a resource type.
pub struct DecodePath<R> {
    data_type: TypeTag,
    resource_type: TypeTag,
    decoders: Vec<Arc<dyn ResourceDecoder>>,
    transcoder: Arc<dyn ResourceTranscoder<R>>,
}

impl<R> DecodePath<R> {
    pub fn new(
        data_type: TypeTag,
        resource_type: TypeTag,
        decoders: Vec<Arc<dyn ResourceDecoder>>,
        transcoder: Arc<dyn ResourceTranscoder<R>>,
    ) -> Self {
        Self {
            data_type,
            resource_type,
            decoders,
            transcoder,
        }
    }

    pub fn data_type(&self) -> TypeTag {
        self.data_type
    }

    pub fn resource_type(&self) -> TypeTag {
        self.resource_type
    }

    pub(crate) fn decode(
        &self,
        data: &Payload,
        width: u32,
        height: u32,
        options: &Options,
        on_decoded: &mut DecodedHook<'_>,
    ) -> Result<R, PathError> {
        let decoded = self.decode_resource(data, width, height, options)?;
        let transformed = on_decoded(decoded).map_err(PathError::Fatal)?;
        self.transcoder
            .transcode(transformed, options)
            .map_err(PathError::Exhausted)
    }

    fn decode_resource(
        &self,
        data: &Payload,
        width: u32,
        height: u32,
        options: &Options,
    ) -> Result<Resource, PathError> {
        let mut faults = Vec::new();
        for decoder in &self.decoders {
            if !decoder.handles(data, options) {
                continue;
            }
            match decoder.decode(data, width, height, options) {
                Ok(Some(resource)) => return Ok(resource),
                Ok(None) => {}
                Err(fault) => {
                    tracing::trace!(
                        data_type = %self.data_type,
                        resource_type = %self.resource_type,
                        error = %fault,
                        "Decoder failed"
                    );
                    faults.push(fault);
                }
            }
        }
        Err(PathError::Exhausted(DecodeFault::with_causes(
            format!(
                "Failed to decode {} into {}",
                self.data_type, self.resource_type
            ),
            faults,
        )))
    }
}

/// Every decode path available for one data type, tried in order.
pub struct LoadPath<R> {
    data_type: TypeTag,
    paths: Vec<DecodePath<R>>,
}

impl<R> LoadPath<R> {
    pub fn new(data_type: TypeTag, paths: Vec<DecodePath<R>>) -> Self {
        Self { data_type, paths }
    }

    pub fn data_type(&self) -> TypeTag {
        self.data_type
    }

    pub fn paths(&self) -> &[DecodePath<R>] {
        &self.paths
    }

    pub(crate) fn load(
        &self,
        data: &Payload,
        width: u32,
        height: u32,
        options: &Options,
        on_decoded: &mut DecodedHook<'_>,
    ) -> Result<R, PathError> {
        let mut faults = Vec::new();
        for path in &self.paths {
            match path.decode(data, width, height, options, on_decoded) {
                Ok(output) => return Ok(output),
                Err(PathError::Exhausted(fault)) => faults.push(fault),
                Err(fatal) => return Err(fatal),
            }
        }
        Err(PathError::Exhausted(DecodeFault::with_causes(
            format!("Failed LoadPath for {}", self.data_type),
            faults,
        )))
    }
}
