//! Caller-facing job callback.

use crate::error::{CallbackError, LoadFailed};
use crate::job::ResolutionJob;
use crate::strategy::DataSource;

/// Receives a job's terminal notification and its reschedule requests.
///
/// Exactly one of `on_resource_ready` and `on_load_failed` is called per job
/// lifetime. Errors returned here are propagated out of
/// [`ResolutionJob::run`] unchanged.
pub trait JobCallback<R>: Send + Sync {
    fn on_resource_ready(&self, resource: R, data_source: DataSource) -> Result<(), CallbackError>;

    fn on_load_failed(&self, error: LoadFailed) -> Result<(), CallbackError>;

    /// The job must be run again on an appropriate executor.
    fn reschedule(&self, job: ResolutionJob<R>) -> Result<(), CallbackError>;
}
