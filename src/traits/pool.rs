// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::WorkerPayload;
use crate::errors::ControlError;
use async_trait::async_trait;

/// Unit of work handed to a pool. The argument is the worker index.
pub type Job = Box<dyn FnOnce(usize) -> Result<WorkerPayload, ControlError> + Send + 'static>;

/// Whether workers share the orchestrator's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    /// Workers see live tasks and cache slots
    Shared,
    /// Workers only see what crosses a serialization boundary
    Isolated,
}

#[async_trait]
pub trait WorkerPool: Send + Sync {
    fn name(&self) -> &'static str;

    fn nworkers(&self) -> usize;

    fn isolation(&self) -> Isolation;

    /// Run `jobs`, job `i` on worker `i`.
    ///
    /// Returns the payloads in submission order, or the first failure.
    async fn map(&self, jobs: Vec<Job>) -> Result<Vec<WorkerPayload>, ControlError>;

    /// Refuse jobs that have not started yet.
    fn shutdown(&self) {}
}
