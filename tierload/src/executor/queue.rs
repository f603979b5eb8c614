//! Priority-ordered work queue.

use crate::job::ResolutionJob;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Min-first heap of jobs: most urgent priority, then earliest order.
pub struct JobQueue<R: Send + 'static> {
    heap: BinaryHeap<Reverse<ResolutionJob<R>>>,
}

impl<R: Send + 'static> JobQueue<R> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, job: ResolutionJob<R>) {
        self.heap.push(Reverse(job));
    }

    pub fn pop(&mut self) -> Option<ResolutionJob<R>> {
        self.heap.pop().map(|Reverse(job)| job)
    }

    /// Removes `job` if it is still queued. Returns whether it was found.
    pub fn remove(&mut self, job: &ResolutionJob<R>) -> bool {
        let before = self.heap.len();
        self.heap.retain(|Reverse(queued)| !queued.same_job(job));
        self.heap.len() != before
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<R: Send + 'static> Default for JobQueue<R> {
    fn default() -> Self {
        Self::new()
    }
}
