// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by the task control, the runners and the worker pools.

use crate::errors::ProcessorError;
use crate::model::TaskId;
use serde::Deserialize;
use thiserror::Error;

/// Construction-time and orchestration errors.
///
/// Everything here except `Processor` and `WorkerFailed` points at a
/// programming error in a caller or a processor implementation and is never
/// retried.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("root {0} is already open")]
    DuplicateRoot(TaskId),

    #[error("root {0} is not open")]
    MissingRoot(TaskId),

    #[error("task {task} is not in the chain of root {root}")]
    MissingTask { root: TaskId, task: TaskId },

    #[error("task {task} is already in the chain of root {root}")]
    DuplicateTask { root: TaskId, task: TaskId },

    #[error("task {0} is not a root task")]
    NotARoot(TaskId),

    #[error("the root {0} must remain the first task of its chain")]
    RootIsFixed(TaskId),

    #[error("index {index} is out of range for a chain of {len} tasks")]
    InvalidIndex { index: usize, len: usize },

    #[error("no processor is registered for task type '{0}'")]
    UnknownTaskType(String),

    #[error(
        "Beware of closure side-effects: an action of processor '{processor}' captures {size} bytes inline (limit {limit}); pass explicit minimal arguments instead"
    )]
    ClosureCapture {
        processor: String,
        size: usize,
        limit: usize,
    },

    #[error("processor '{processor}' cannot run in an isolated worker: {reason}")]
    Unpoolable { processor: String, reason: String },

    #[error("cached value of task {0} has an unexpected type")]
    CacheType(TaskId),

    #[error("worker pool has been shut down")]
    PoolShutdown,

    #[error("worker {worker} failed: {reason}")]
    WorkerFailed { worker: usize, reason: String },

    #[error("processor failed: {0}")]
    Processor(#[from] ProcessorError),

    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("invalid task configuration for '{tasktype}': {reason}")]
    InvalidTask { tasktype: String, reason: String },
}

/// How per-item failures are handled when a frame is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Skip the failing key and continue with the others
    #[default]
    ContinueOnError,
    /// Abort materialization on the first failing key
    FailFast,
}
