//! Lane executor: a fixed set of affinity groups, each draining its own queue.

use super::queue::JobQueue;
use crate::affinity::AffinityGroup;
use crate::job::ResolutionJob;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Lane executor configuration.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Number of lanes. Each lane runs one job at a time.
    pub lanes: usize,
}

impl ExecutorConfig {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes: lanes.max(1),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::new(crate::config::default_lanes())
    }
}

struct Lane<R: Send + 'static> {
    affinity: AffinityGroup,
    queue: Mutex<JobQueue<R>>,
    notify: Notify,
}

/// Runs jobs on a fixed number of lanes.
///
/// A job is bound to lane `order % lanes` for its whole lifetime, so a
/// rescheduled job always comes back to the lane (and affinity group) that
/// started it. Jobs run on the blocking thread pool inside their lane's
/// affinity scope.
pub struct LaneExecutor<R: Send + 'static> {
    lanes: Vec<Lane<R>>,
}

impl<R: Send + 'static> LaneExecutor<R> {
    pub fn new(config: ExecutorConfig) -> Self {
        let lanes = (0..config.lanes.max(1))
            .map(|_| Lane {
                affinity: AffinityGroup::new(),
                queue: Mutex::new(JobQueue::new()),
                notify: Notify::new(),
            })
            .collect();
        Self { lanes }
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Affinity group of lane `index`.
    pub fn lane_affinity(&self, index: usize) -> Option<AffinityGroup> {
        self.lanes.get(index).map(|lane| lane.affinity)
    }

    fn lane_index(&self, job: &ResolutionJob<R>) -> usize {
        (job.order() % self.lanes.len() as u64) as usize
    }

    /// Queues a job on its lane.
    pub fn submit(&self, job: ResolutionJob<R>) {
        let index = self.lane_index(&job);
        trace!(lane = index, order = job.order(), priority = ?job.priority(), "Job queued");
        let lane = &self.lanes[index];
        lane.queue.lock().push(job);
        lane.notify.notify_one();
    }

    /// Queues a job that asked to be run again.
    pub fn resubmit(&self, job: ResolutionJob<R>) {
        self.submit(job);
    }

    /// Removes a job that has not started running yet.
    pub fn remove(&self, job: &ResolutionJob<R>) -> bool {
        let index = self.lane_index(job);
        self.lanes[index].queue.lock().remove(job)
    }

    /// Total number of queued jobs across all lanes.
    pub fn queued(&self) -> usize {
        self.lanes.iter().map(|lane| lane.queue.lock().len()).sum()
    }

    /// Drives every lane until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(lanes = self.lanes.len(), "Lane executor started");

        let mut handles = Vec::with_capacity(self.lanes.len());
        for index in 0..self.lanes.len() {
            handles.push(tokio::spawn(
                self.clone().run_lane(index, shutdown.clone()),
            ));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Lane task failed");
            }
        }

        info!(remaining = self.queued(), "Lane executor stopped");
    }

    async fn run_lane(self: Arc<Self>, index: usize, shutdown: CancellationToken) {
        let lane = &self.lanes[index];
        debug!(lane = index, affinity = %lane.affinity, "Lane started");

        while !shutdown.is_cancelled() {
            let next = lane.queue.lock().pop();
            let job = match next {
                Some(job) => job,
                None => {
                    tokio::select! {
                        biased;

                        _ = shutdown.cancelled() => break,
                        _ = lane.notify.notified() => {}
                    }
                    continue;
                }
            };

            let affinity = lane.affinity;
            let order = job.order();
            match tokio::task::spawn_blocking(move || job.run(affinity)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(lane = index, order, error = %e, "Job run failed"),
                Err(e) => error!(lane = index, order, error = %e, "Job run panicked"),
            }
        }

        debug!(lane = index, "Lane stopped");
    }
}
