//! Job execution.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                LaneExecutor                   │
//! │  submit / resubmit / remove                   │
//! ├──────────────┬──────────────┬────────────────┤
//! │ lane 0       │ lane 1       │ lane N-1       │
//! │ AffinityGroup│ AffinityGroup│ AffinityGroup  │
//! │ JobQueue     │ JobQueue     │ JobQueue       │
//! └──────────────┴──────────────┴────────────────┘
//!          │ spawn_blocking(job.run(affinity))
//!          ▼
//!    ResolutionJob
//! ```
//!
//! Queues pop the most urgent priority first, first-come first-served within
//! a priority.

mod lanes;
mod queue;

pub use lanes::{ExecutorConfig, LaneExecutor};
pub use queue::JobQueue;
