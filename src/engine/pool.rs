// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Worker pools.
//!
//! Three implementations share the [`WorkerPool`] interface:
//!
//! * [`DummyPool`] runs every job inline, one after the other
//! * [`ThreadPool`] runs jobs on blocking threads sharing the orchestrator's memory
//! * [`IsolatedPool`] runs jobs on blocking threads, but the pooled runner only
//!   hands its workers serialized task snapshots and reads back serialized output

use crate::engine::pooled_runner::RootOutput;
use crate::errors::ControlError;
use crate::traits::{Isolation, Job, WorkerPool};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// What a worker hands back to the orchestrator.
#[derive(Debug)]
pub enum WorkerPayload {
    /// Live output, from workers sharing memory
    Roots(Vec<RootOutput>),
    /// Serialized output, from isolated workers
    Encoded(Vec<u8>),
}

/// Contiguous chunk `index` of `items` split into `nchunks` near-equal chunks.
///
/// Chunks partition `items` in order and their sizes differ by at most one,
/// the first `len % nchunks` chunks being the larger ones.
pub fn poolchunk<T>(items: &[T], nchunks: usize, index: usize) -> &[T] {
    if nchunks == 0 || index >= nchunks {
        return &[];
    }
    let per = items.len() / nchunks;
    let rem = items.len() % nchunks;
    let start = per * index + rem.min(index);
    let stop = per * (index + 1) + rem.min(index + 1);
    &items[start..stop]
}

/// Number of workers used when none is configured.
pub fn default_nworkers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(crate::config::consts::DEFAULT_NWORKERS)
}

/// Runs jobs inline on the calling thread.
#[derive(Debug, Clone)]
pub struct DummyPool {
    nworkers: usize,
}

impl DummyPool {
    pub fn new() -> Self {
        Self { nworkers: 1 }
    }

    /// Pretend to have `nworkers` workers, still running jobs inline.
    pub fn with_workers(nworkers: usize) -> Self {
        Self {
            nworkers: nworkers.max(1),
        }
    }
}

impl Default for DummyPool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerPool for DummyPool {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn nworkers(&self) -> usize {
        self.nworkers
    }

    fn isolation(&self) -> Isolation {
        Isolation::Shared
    }

    async fn map(&self, jobs: Vec<Job>) -> Result<Vec<WorkerPayload>, ControlError> {
        jobs.into_iter()
            .enumerate()
            .map(|(worker, job)| job(worker))
            .collect()
    }
}

/// Runs jobs on tokio's blocking threads, at most `nworkers` at a time.
#[derive(Debug)]
pub struct ThreadPool {
    nworkers: usize,
    cancellation: CancellationToken,
}

impl ThreadPool {
    pub fn new(nworkers: usize) -> Self {
        Self {
            nworkers: nworkers.max(1),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Run `jobs`, returning their payloads in submission order.
    ///
    /// The first failure cancels the jobs still waiting for a permit, and the
    /// call returns only once every job already started has finished.
    async fn run_jobs(&self, jobs: Vec<Job>) -> Result<Vec<WorkerPayload>, ControlError> {
        if self.cancellation.is_cancelled() {
            return Err(ControlError::PoolShutdown);
        }

        let semaphore = Arc::new(Semaphore::new(self.nworkers));
        let batch = self.cancellation.child_token();
        let mut handles = Vec::with_capacity(jobs.len());

        for (worker, job) in jobs.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let batch = batch.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ControlError::WorkerFailed {
                        worker,
                        reason: e.to_string(),
                    })?;
                if batch.is_cancelled() {
                    return Ok(None);
                }
                let result = tokio::task::spawn_blocking(move || job(worker))
                    .await
                    .map_err(|e| ControlError::WorkerFailed {
                        worker,
                        reason: e.to_string(),
                    })
                    .and_then(|result| result);
                if result.is_err() {
                    batch.cancel();
                }
                result.map(Some)
            }));
        }

        let mut payloads = Vec::with_capacity(handles.len());
        let mut first_error = None;
        let mut skipped = false;
        for (worker, handle) in handles.into_iter().enumerate() {
            let outcome = handle.await.map_err(|e| ControlError::WorkerFailed {
                worker,
                reason: e.to_string(),
            });
            match outcome.and_then(|result| result) {
                Ok(Some(payload)) => payloads.push(payload),
                Ok(None) => skipped = true,
                Err(e) => {
                    batch.cancel();
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None if skipped => Err(ControlError::PoolShutdown),
            None => Ok(payloads),
        }
    }
}

#[async_trait]
impl WorkerPool for ThreadPool {
    fn name(&self) -> &'static str {
        "threads"
    }

    fn nworkers(&self) -> usize {
        self.nworkers
    }

    fn isolation(&self) -> Isolation {
        Isolation::Shared
    }

    async fn map(&self, jobs: Vec<Job>) -> Result<Vec<WorkerPayload>, ControlError> {
        self.run_jobs(jobs).await
    }

    fn shutdown(&self) {
        self.cancellation.cancel();
    }
}

/// A thread pool whose workers are fed through a serialization boundary.
#[derive(Debug)]
pub struct IsolatedPool {
    threads: ThreadPool,
}

impl IsolatedPool {
    pub fn new(nworkers: usize) -> Self {
        Self {
            threads: ThreadPool::new(nworkers),
        }
    }
}

#[async_trait]
impl WorkerPool for IsolatedPool {
    fn name(&self) -> &'static str {
        "isolated"
    }

    fn nworkers(&self) -> usize {
        self.threads.nworkers
    }

    fn isolation(&self) -> Isolation {
        Isolation::Isolated
    }

    async fn map(&self, jobs: Vec<Job>) -> Result<Vec<WorkerPayload>, ControlError> {
        self.threads.run_jobs(jobs).await
    }

    fn shutdown(&self) {
        self.threads.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(len: usize, n: usize) -> Vec<Vec<usize>> {
        let items: Vec<usize> = (0..len).collect();
        (0..n).map(|i| poolchunk(&items, n, i).to_vec()).collect()
    }

    #[test]
    fn test_poolchunk_examples() {
        let items: Vec<usize> = (0..11).collect();
        assert_eq!(poolchunk(&items, 5, 0), &[0, 1, 2]);
        assert_eq!(poolchunk(&items, 5, 1), &[3, 4]);
        assert_eq!(poolchunk(&items, 5, 4), &[9, 10]);
        assert!(poolchunk(&items, 5, 5).is_empty());
        assert!(poolchunk(&items, 0, 0).is_empty());
    }

    #[test]
    fn test_poolchunk_partitions_in_order() {
        for len in 0..40 {
            for n in 1..12 {
                let parts = chunks(len, n);
                let flat: Vec<usize> = parts.iter().flatten().copied().collect();
                assert_eq!(flat, (0..len).collect::<Vec<_>>(), "len={len} n={n}");

                let sizes: Vec<usize> = parts.iter().map(Vec::len).collect();
                let max = sizes.iter().max().copied().unwrap_or(0);
                let min = sizes.iter().min().copied().unwrap_or(0);
                assert!(max - min <= 1, "len={len} n={n} sizes={sizes:?}");
                // larger chunks come first
                assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
            }
        }
    }

    fn numbered_jobs(count: usize) -> Vec<Job> {
        (0..count)
            .map(|_| -> Job { Box::new(|worker| Ok(WorkerPayload::Encoded(vec![worker as u8]))) })
            .collect()
    }

    fn indexes(payloads: Vec<WorkerPayload>) -> Vec<u8> {
        payloads
            .into_iter()
            .map(|payload| match payload {
                WorkerPayload::Encoded(bytes) => bytes[0],
                WorkerPayload::Roots(_) => panic!("unexpected live payload"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_dummy_pool_keeps_submission_order() {
        let pool = DummyPool::with_workers(3);
        let payloads = pool.map(numbered_jobs(3)).await.unwrap();
        assert_eq!(indexes(payloads), vec![0, 1, 2]);
        assert_eq!(pool.isolation(), Isolation::Shared);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_thread_pool_keeps_submission_order() {
        let pool = ThreadPool::new(2);
        let payloads = pool.map(numbered_jobs(5)).await.unwrap();
        assert_eq!(indexes(payloads), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_thread_pool_reports_worker_failure() {
        let pool = ThreadPool::new(2);
        let jobs: Vec<Job> = vec![
            Box::new(|_| Ok(WorkerPayload::Encoded(vec![]))) as Job,
            Box::new(|_| Err(ControlError::PoolShutdown)) as Job,
        ];
        assert!(matches!(pool.map(jobs).await, Err(ControlError::PoolShutdown)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_thread_pool_failure_waits_for_running_jobs() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let counted = |started: Arc<AtomicUsize>, finished: Arc<AtomicUsize>| -> Job {
            Box::new(move |_: usize| -> Result<WorkerPayload, ControlError> {
                started.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(WorkerPayload::Encoded(vec![]))
            })
        };
        let failing = {
            let started = started.clone();
            Box::new(move |worker: usize| -> Result<WorkerPayload, ControlError> {
                while started.load(Ordering::SeqCst) == 0 {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(ControlError::WorkerFailed {
                    worker,
                    reason: "boom".to_string(),
                })
            }) as Job
        };

        let pool = ThreadPool::new(2);
        let jobs = vec![
            failing,
            counted(started.clone(), finished.clone()),
            counted(started.clone(), finished.clone()),
        ];
        match pool.map(jobs).await {
            Err(ControlError::WorkerFailed { worker, reason }) => {
                assert_eq!(worker, 0);
                assert_eq!(reason, "boom");
            }
            other => panic!("expected the worker failure, got {other:?}"),
        }

        // the running job finished before map returned; the queued one never started
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(!pool.is_shut_down());
        assert_eq!(pool.map(numbered_jobs(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_work() {
        let pool = IsolatedPool::new(2);
        pool.shutdown();
        assert!(matches!(
            pool.map(numbered_jobs(2)).await,
            Err(ControlError::PoolShutdown)
        ));
    }
}
