//! Job partitioning for parallel runs
//!
//! Jobs are dealt out round-robin: job `i` goes to partition
//! `i % worker_count`. Partition sizes therefore never differ by more than
//! one, and a fixed input order always yields the same assignment.

use std::num::NonZeroUsize;
use std::thread;

/// Split `jobs` into `worker_count` disjoint, order-preserving partitions.
///
/// A `worker_count` of zero is treated as one. Partitions may be empty when
/// there are fewer jobs than workers.
pub fn partition<T>(jobs: Vec<T>, worker_count: usize) -> Vec<Vec<T>> {
    let worker_count = worker_count.max(1);
    let per_worker = jobs.len().div_ceil(worker_count);
    let mut partitions: Vec<Vec<T>> = (0..worker_count)
        .map(|_| Vec::with_capacity(per_worker))
        .collect();

    for (index, job) in jobs.into_iter().enumerate() {
        partitions[index % worker_count].push(job);
    }

    partitions
}

/// Decides how many workers a run may use and partitions its jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    max_workers: usize,
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl Partitioner {
    /// Partitioner limited to the machine's available parallelism
    pub fn new() -> Self {
        let max_workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self { max_workers }
    }

    /// Partitioner with an explicit upper bound on workers
    pub fn with_max_workers(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Upper bound on workers
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Clamp a requested worker count into `1..=max_workers`
    pub fn worker_count(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_workers)
    }

    /// Partition `jobs` for `requested` workers.
    ///
    /// The worker count is clamped as in [`worker_count`](Self::worker_count)
    /// and further limited to the number of jobs, so every returned partition
    /// is non-empty unless `jobs` is.
    pub fn split<T>(&self, jobs: Vec<T>, requested: usize) -> Vec<Vec<T>> {
        let workers = self.worker_count(requested).min(jobs.len().max(1));
        partition(jobs, workers)
    }
}
