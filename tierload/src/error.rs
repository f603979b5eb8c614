//! Error taxonomy for the resolution engine.
//!
//! Errors fall into two families:
//!
//! - **Recorded faults** ([`Fault`]): a tier's fetch failed ([`FetchFault`]) or a
//!   candidate decode path failed ([`DecodeFault`]). These never abort a job on their
//!   own; they are appended to the job's fault list and the next candidate or tier is
//!   tried. When everything is exhausted the list is delivered once, in attempt order,
//!   inside a [`LoadFailed`].
//! - **Run errors** ([`JobError`]): what [`ResolutionJob::run`] returns to the executor.
//!   [`ProtocolFault`]s indicate corrupted orchestration state and [`CallbackError`]s
//!   come from the caller's own callback; both must reach the executor unchanged.
//!
//! [`ResolutionJob::run`]: crate::job::ResolutionJob::run

use crate::cache::CacheError;
use crate::job::Stage;
use crate::key::Key;
use crate::resource::TypeTag;
use crate::strategy::{DataSource, EncodeStrategy};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Fetch errors
// =============================================================================

/// Error reported by a [`DataFetcher`](crate::fetch::DataFetcher) through its callback.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The fetch observed the job's cancellation token.
    #[error("fetch cancelled")]
    Cancelled,

    /// The underlying source reported a failure.
    #[error("{0}")]
    Failed(String),

    /// I/O failure while reading the source.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),
}

impl FetchError {
    /// Creates a generic fetch failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// A tier's data source failed for one fetch attempt.
#[derive(Debug, Clone, Error)]
#[error("fetching data failed for {key} from {data_source} ({data_type}): {cause}")]
pub struct FetchFault {
    /// Key that was being attempted.
    pub key: Key,
    /// Provenance of the failed fetcher.
    pub data_source: DataSource,
    /// Data type the fetcher produces.
    pub data_type: TypeTag,
    /// Error reported by the fetcher.
    #[source]
    pub cause: FetchError,
}

// =============================================================================
// Decode errors
// =============================================================================

/// A candidate decode path, or every candidate for one payload, failed.
///
/// Decode faults nest: a load path failure carries one cause per decode path
/// tried, and each decode path failure carries one cause per decoder.
#[derive(Debug, Clone)]
pub struct DecodeFault {
    message: String,
    causes: Vec<DecodeFault>,
    key: Option<Key>,
    data_source: Option<DataSource>,
}

impl DecodeFault {
    /// Creates a fault without causes.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
            key: None,
            data_source: None,
        }
    }

    /// Creates a fault that aggregates the failures of several candidates.
    pub fn with_causes(message: impl Into<String>, causes: Vec<DecodeFault>) -> Self {
        Self {
            message: message.into(),
            causes,
            key: None,
            data_source: None,
        }
    }

    /// Attaches the attempted key and provenance of the data being decoded.
    pub fn with_details(mut self, key: Key, data_source: DataSource) -> Self {
        self.key = Some(key);
        self.data_source = Some(data_source);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn causes(&self) -> &[DecodeFault] {
        &self.causes
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn data_source(&self) -> Option<DataSource> {
        self.data_source
    }

    /// Flattens the cause tree into the leaf faults, depth first.
    pub fn root_causes(&self) -> Vec<&DecodeFault> {
        if self.causes.is_empty() {
            return vec![self];
        }
        self.causes.iter().flat_map(|c| c.root_causes()).collect()
    }
}

impl fmt::Display for DecodeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let (Some(key), Some(source)) = (&self.key, self.data_source) {
            write!(f, " [key={}, source={}]", key, source)?;
        }
        if !self.causes.is_empty() {
            write!(f, " ({} causes)", self.causes.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeFault {}

// =============================================================================
// Recorded faults and aggregated failure
// =============================================================================

/// One entry in a job's recorded fault list.
#[derive(Debug, Clone, Error)]
pub enum Fault {
    #[error(transparent)]
    Fetch(#[from] FetchFault),

    #[error(transparent)]
    Decode(#[from] DecodeFault),

    /// An unexpected run error that was recorded before being propagated.
    #[error("unexpected fault: {0}")]
    Unexpected(String),
}

impl Fault {
    pub fn is_fetch(&self) -> bool {
        matches!(self, Fault::Fetch(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Fault::Decode(_))
    }
}

/// Terminal failure delivered to the caller when every tier and candidate is exhausted.
#[derive(Debug, Clone, Error)]
#[error("{message} ({} recorded faults)", .causes.len())]
pub struct LoadFailed {
    message: String,
    causes: Vec<Fault>,
}

impl LoadFailed {
    pub fn new(message: impl Into<String>, causes: Vec<Fault>) -> Self {
        Self {
            message: message.into(),
            causes,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Recorded faults, in the order they were recorded.
    pub fn causes(&self) -> &[Fault] {
        &self.causes
    }

    /// Only the fetch faults, in attempt order.
    pub fn fetch_faults(&self) -> impl Iterator<Item = &FetchFault> {
        self.causes.iter().filter_map(|c| match c {
            Fault::Fetch(f) => Some(f),
            _ => None,
        })
    }
}

// =============================================================================
// Run errors
// =============================================================================

/// Programming-error conditions in the job's orchestration.
#[derive(Debug, Error)]
pub enum ProtocolFault {
    /// A second terminal notification was attempted.
    #[error("already notified{}", .last_cause.as_ref().map(|c| format!(" (last fault: {})", c)).unwrap_or_default())]
    AlreadyNotified { last_cause: Option<Fault> },

    /// No tier exists for the stage, or the stage has no successor.
    #[error("unrecognized stage: {0:?}")]
    UnrecognizedStage(Option<Stage>),

    /// The job was run without a run reason.
    #[error("unrecognized run reason")]
    UnrecognizedRunReason,

    /// A handle from a previous lifetime of a pooled job was used.
    #[error("job used after release (handle generation {handle}, job generation {current})")]
    UseAfterRelease { handle: u64, current: u64 },

    /// `init` was called on a job that has not been released.
    #[error("job is still active and cannot be re-initialized")]
    AlreadyActive,

    /// A decode was requested but no data was retrieved.
    #[error("decode requested without retrieved data")]
    MissingRetrievedData,

    /// The cache strategy asked to persist a resource with an encode strategy that
    /// does not map to a cache key.
    #[error("unsupported encode strategy: {0}")]
    UnsupportedEncodeStrategy(EncodeStrategy),
}

/// Error raised by a caller-supplied callback.
///
/// Always propagated to the executor untouched.
#[derive(Debug, Error)]
#[error("callback failed: {message}")]
pub struct CallbackError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Errors returned from a job run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Callback(#[from] CallbackError),

    #[error(transparent)]
    Protocol(#[from] ProtocolFault),

    /// The cache strategy wants the resource persisted but nothing can encode it.
    #[error("no result encoder available for {0}")]
    NoResultEncoder(TypeTag),

    /// A transformation is required but none is registered for the resource type.
    #[error("missing transformation for {0}")]
    MissingTransformation(TypeTag),

    /// The registry knows no resource type that could satisfy the request.
    #[error("no load path from model {model} to {transcode}")]
    NoLoadPath { model: String, transcode: &'static str },

    /// Writing the deferred encode to the byte cache failed.
    #[error("deferred cache write failed: {0}")]
    CacheWrite(#[from] CacheError),
}

impl JobError {
    pub fn is_callback(&self) -> bool {
        matches!(self, JobError::Callback(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, JobError::Protocol(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fault_root_causes_flatten() {
        let leaf_a = DecodeFault::new("decoder a");
        let leaf_b = DecodeFault::new("decoder b");
        let path = DecodeFault::with_causes("path", vec![leaf_a, leaf_b]);
        let load = DecodeFault::with_causes("load", vec![path, DecodeFault::new("other path")]);

        let roots: Vec<&str> = load.root_causes().iter().map(|f| f.message()).collect();
        assert_eq!(roots, vec!["decoder a", "decoder b", "other path"]);
    }

    #[test]
    fn test_decode_fault_display_includes_details() {
        let fault = DecodeFault::new("bad header")
            .with_details(Key::new("https://a/b.png"), DataSource::Remote);
        let text = fault.to_string();
        assert!(text.contains("bad header"));
        assert!(text.contains("https://a/b.png"));
        assert!(text.contains("remote"));
    }

    #[test]
    fn test_load_failed_filters_fetch_faults() {
        let fetch = FetchFault {
            key: Key::new("k"),
            data_source: DataSource::Remote,
            data_type: TypeTag::of::<Vec<u8>>(),
            cause: FetchError::failed("404"),
        };
        let failed = LoadFailed::new(
            "Failed to load resource",
            vec![Fault::Fetch(fetch), Fault::Decode(DecodeFault::new("bad"))],
        );
        assert_eq!(failed.causes().len(), 2);
        assert_eq!(failed.fetch_faults().count(), 1);
        assert!(failed.to_string().contains("2 recorded faults"));
    }

    #[test]
    fn test_already_notified_mentions_last_fault() {
        let fault = ProtocolFault::AlreadyNotified {
            last_cause: Some(Fault::Unexpected("boom".into())),
        };
        assert!(fault.to_string().contains("boom"));

        let bare = ProtocolFault::AlreadyNotified { last_cause: None };
        assert_eq!(bare.to_string(), "already notified");
    }

    #[test]
    fn test_job_error_classification() {
        let callback: JobError = CallbackError::new("listener panicked").into();
        assert!(callback.is_callback());
        assert!(!callback.is_protocol());

        let protocol: JobError = ProtocolFault::UnrecognizedRunReason.into();
        assert!(protocol.is_protocol());
    }
}
