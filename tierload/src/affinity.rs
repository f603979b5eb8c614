//! Execution affinity.
//!
//! An [`AffinityGroup`] names a logical executor (a lane, a dedicated disk-cache
//! worker, a source worker). Whoever runs a job enters the group's scope for the
//! duration of the run; fetch callbacks compare the scope they are invoked in
//! against the group that owns the job's tier iteration. A callback that arrives
//! outside the owning scope hands the work back to the executor instead of
//! continuing inline.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GROUP: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: Cell<Option<AffinityGroup>> = const { Cell::new(None) };
}

/// Identity of a logical executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AffinityGroup(u64);

impl AffinityGroup {
    /// Allocates a new, process-unique group.
    pub fn new() -> Self {
        Self(NEXT_GROUP.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }

    /// Enters this group's scope on the current thread until the guard drops.
    ///
    /// Scopes nest; dropping the guard restores the previous group.
    pub fn enter(&self) -> AffinityScope {
        let previous = CURRENT.with(|c| c.replace(Some(*self)));
        AffinityScope { previous }
    }

    /// The group whose scope the current thread is in, if any.
    pub fn current() -> Option<AffinityGroup> {
        CURRENT.with(|c| c.get())
    }
}

impl Default for AffinityGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AffinityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "affinity-{}", self.0)
    }
}

/// Guard returned by [`AffinityGroup::enter`].
#[must_use = "the scope ends when the guard is dropped"]
pub struct AffinityScope {
    previous: Option<AffinityGroup>,
}

impl Drop for AffinityScope {
    fn drop(&mut self) {
        CURRENT.with(|c| c.set(self.previous));
    }
}
