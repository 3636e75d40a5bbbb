// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for task tree mutations.
//!
//! This module contains message types for logging events related to:
//! * Opening and closing tracks
//! * Adding, removing and updating tasks
//! * Cache invalidation triggered by those mutations

use crate::model::TaskId;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A root was opened with its chain.
///
/// # Log Level
/// `info!` - Important operational event
pub struct TrackOpened {
    pub root: TaskId,
    pub task_count: usize,
}

impl Display for TrackOpened {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Opened track {} with {} tasks",
            self.root, self.task_count
        )
    }
}

impl StructuredLog for TrackOpened {
    fn log(&self) {
        tracing::info!(
            root = %self.root,
            task_count = self.task_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "track_opened",
            span_name = name,
            root = %self.root,
            task_count = self.task_count,
        )
    }
}

/// A root was closed and its caches dropped.
///
/// # Log Level
/// `info!` - Important operational event
pub struct TrackClosed {
    pub root: TaskId,
}

impl Display for TrackClosed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Closed track {}", self.root)
    }
}

impl StructuredLog for TrackClosed {
    fn log(&self) {
        tracing::info!(root = %self.root, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("track_closed", span_name = name, root = %self.root)
    }
}

/// Which mutation touched a chain.
#[derive(Debug, Clone, Copy)]
pub enum MutationKind {
    Add,
    Remove,
    Update,
}

impl Display for MutationKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            MutationKind::Add => f.write_str("added"),
            MutationKind::Remove => f.write_str("removed"),
            MutationKind::Update => f.write_str("updated"),
        }
    }
}

/// A task was added, removed or updated.
///
/// # Log Level
/// `debug!` - Frequent during interactive sessions
///
/// # Example
/// ```
/// use the_tasktree::model::TaskId;
/// use the_tasktree::observability::messages::control::{MutationKind, TaskMutated};
///
/// let msg = TaskMutated {
///     kind: MutationKind::Add,
///     root: TaskId::next(),
///     task: TaskId::next(),
///     index: 2,
/// };
///
/// assert!(msg.to_string().contains("added at position 2"));
/// ```
pub struct TaskMutated {
    pub kind: MutationKind,
    pub root: TaskId,
    pub task: TaskId,
    pub index: usize,
}

impl Display for TaskMutated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task {} {} at position {} of track {}",
            self.task, self.kind, self.index, self.root
        )
    }
}

impl StructuredLog for TaskMutated {
    fn log(&self) {
        tracing::debug!(
            root = %self.root,
            task = %self.task,
            index = self.index,
            mutation = %self.kind,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "task_mutated",
            span_name = name,
            root = %self.root,
            task = %self.task,
            index = self.index,
        )
    }
}

/// Cache entries were cleared from a chain position onward.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct CacheInvalidated {
    pub root: TaskId,
    pub from_index: usize,
    pub cleared: usize,
}

impl Display for CacheInvalidated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Invalidated {} cache entries of track {} from position {}",
            self.cleared, self.root, self.from_index
        )
    }
}

impl StructuredLog for CacheInvalidated {
    fn log(&self) {
        tracing::debug!(
            root = %self.root,
            from_index = self.from_index,
            cleared = self.cleared,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "cache_invalidated",
            span_name = name,
            root = %self.root,
            from_index = self.from_index,
        )
    }
}
