//! Teardown gating for pooled jobs.

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct GateState {
    released: bool,
    encode_complete: bool,
    failed: bool,
}

impl GateState {
    fn is_complete(&self, removed_from_queue: bool) -> bool {
        (self.encode_complete || self.failed || removed_from_queue) && self.released
    }
}

/// Decides when a job may be torn down and returned to its pool.
///
/// A job is done once its owner has released it and it has either finished
/// encoding, failed, or been removed from the work queue before running.
/// Each method returns `true` exactly when that call completes the job.
#[derive(Debug, Default)]
pub struct LifecycleGate {
    state: Mutex<GateState>,
}

impl LifecycleGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&self, removed_from_queue: bool) -> bool {
        let mut state = self.state.lock();
        state.released = true;
        state.is_complete(removed_from_queue)
    }

    pub fn mark_encode_complete(&self) -> bool {
        let mut state = self.state.lock();
        state.encode_complete = true;
        state.is_complete(false)
    }

    pub fn mark_failed(&self) -> bool {
        let mut state = self.state.lock();
        state.failed = true;
        state.is_complete(false)
    }

    pub fn reset(&self) {
        *self.state.lock() = GateState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_alone_is_not_complete() {
        let gate = LifecycleGate::new();
        assert!(!gate.release(false));
    }

    #[test]
    fn test_encode_then_release() {
        let gate = LifecycleGate::new();
        assert!(!gate.mark_encode_complete());
        assert!(gate.release(false));
    }

    #[test]
    fn test_release_then_failure() {
        let gate = LifecycleGate::new();
        assert!(!gate.release(false));
        assert!(gate.mark_failed());
    }

    #[test]
    fn test_removed_from_queue_completes_on_release() {
        let gate = LifecycleGate::new();
        assert!(gate.release(true));
    }

    #[test]
    fn test_reset_clears_flags() {
        let gate = LifecycleGate::new();
        gate.mark_failed();
        gate.reset();
        assert!(!gate.release(false));
    }
}
