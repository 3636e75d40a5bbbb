// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pooled execution.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Pooled run started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_tasktree::observability::messages::pool::PooledRunStarted;
///
/// let msg = PooledRunStarted {
///     pool: "threads",
///     nworkers: 4,
///     root_count: 10,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PooledRunStarted<'a> {
    pub pool: &'a str,
    pub nworkers: usize,
    pub root_count: usize,
}

impl Display for PooledRunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting pooled run on {} pool: {} roots over {} workers",
            self.pool, self.root_count, self.nworkers
        )
    }
}

impl StructuredLog for PooledRunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            pool = self.pool,
            nworkers = self.nworkers,
            root_count = self.root_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pooled_run",
            span_name = name,
            pool = self.pool,
            nworkers = self.nworkers,
            root_count = self.root_count,
        )
    }
}

/// No stage is slow enough to be worth a pool; the chains run serially.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct PoolBypassed<'a> {
    pub pool: &'a str,
    pub root_count: usize,
}

impl Display for PoolBypassed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Bypassing {} pool: no slow stage in {} roots, running serially",
            self.pool, self.root_count
        )
    }
}

impl StructuredLog for PoolBypassed<'_> {
    fn log(&self) {
        tracing::debug!(pool = self.pool, root_count = self.root_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("pool_bypassed", span_name = name, pool = self.pool)
    }
}

/// A worker received its chunk of roots.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct WorkerChunkAssigned {
    pub worker: usize,
    pub root_count: usize,
}

impl Display for WorkerChunkAssigned {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker {} assigned {} roots", self.worker, self.root_count)
    }
}

impl StructuredLog for WorkerChunkAssigned {
    fn log(&self) {
        tracing::debug!(worker = self.worker, root_count = self.root_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("worker_chunk", span_name = name, worker = self.worker)
    }
}

/// Remote results were merged into a live cache.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct CacheMerged<'a> {
    pub tasktype: &'a str,
    pub items: usize,
}

impl Display for CacheMerged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Merged {} remote items into the chain caches up to '{}'",
            self.items, self.tasktype
        )
    }
}

impl StructuredLog for CacheMerged<'_> {
    fn log(&self) {
        tracing::debug!(tasktype = self.tasktype, items = self.items, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("cache_merged", span_name = name, tasktype = self.tasktype)
    }
}

/// Pooled run completed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PooledRunCompleted<'a> {
    pub pool: &'a str,
    pub root_count: usize,
    pub item_count: usize,
    pub duration: std::time::Duration,
}

impl Display for PooledRunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pooled run on {} pool completed: {} roots, {} items in {:?}",
            self.pool, self.root_count, self.item_count, self.duration
        )
    }
}

impl StructuredLog for PooledRunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            pool = self.pool,
            root_count = self.root_count,
            item_count = self.item_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pooled_run_completed",
            span_name = name,
            pool = self.pool,
            duration = ?self.duration,
        )
    }
}
