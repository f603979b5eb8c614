//! Resolution jobs.
//!
//! A [`ResolutionJob`] turns one [`RequestSpec`] into one decoded value by
//! walking tiers in order, stopping at the first tier that produces something
//! decodable:
//!
//! ```text
//!   Initialize
//!       │
//!       ▼
//!   ResourceCache ──hit──┐     transformed bytes, no re-transform
//!       │ miss           │
//!       ▼                │
//!   DataCache ─────hit───┤     raw source bytes
//!       │ miss           │
//!       ▼                ▼
//!   Source ──────────▶ decode ──▶ notify ──▶ Encode (deferred cache write)
//!       │ exhausted
//!       ▼
//!   Finished ──▶ load failed (every recorded fault, in order)
//! ```
//!
//! Stages the [`CacheStrategy`](crate::strategy::CacheStrategy) excludes are
//! skipped. Moving to `Source` always reschedules the job so the owner can
//! move it to a different executor.
//!
//! # Lifecycle
//!
//! Jobs come from a [`JobPool`]. A job returns to its pool once its owner has
//! released it and it has either finished encoding, failed, or been removed
//! from the work queue before running. Handles from a finished lifetime are
//! stale and every lifecycle operation on them fails.

mod callback;
mod deferred;
mod gate;
mod pool;
mod resolution;
mod spec;
mod stage;
mod tier;

pub use callback::JobCallback;
pub use deferred::DeferredEncodePlan;
pub use gate::LifecycleGate;
pub use pool::{JobPool, DEFAULT_POOL_CAPACITY};
pub use resolution::ResolutionJob;
pub use spec::{Model, Priority, RequestSpec};
pub use stage::{RunReason, Stage};
