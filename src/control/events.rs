// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Notifications emitted by the [`TaskController`](crate::control::TaskController).
//!
//! Every successful mutation of the task tree emits exactly one event, after the
//! tree and the caches are back in a consistent state. Observers are called
//! synchronously, in registration order, on the thread performing the mutation.

use crate::model::{Params, Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OpenTrack,
    CloseTrack,
    AddTask,
    RemoveTask,
    UpdateTask,
}

#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A chain was opened. `model` is the full chain, root first.
    OpenTrack { root: TaskId, model: Vec<Task> },
    /// A chain was closed. `model` is the chain as it was.
    CloseTrack { root: TaskId, model: Vec<Task> },
    /// `task` was inserted at `index`. `old` lists the chain before insertion.
    AddTask {
        root: TaskId,
        task: Task,
        index: usize,
        old: Vec<TaskId>,
    },
    /// `task` was removed from `index`. `old` lists the chain before removal.
    RemoveTask {
        root: TaskId,
        task: Task,
        index: usize,
        old: Vec<TaskId>,
    },
    /// `task` (in its new state) had `new` applied; `old` holds the values replaced.
    UpdateTask {
        root: TaskId,
        task: Task,
        old: Params,
        new: Params,
    },
}

impl TaskEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TaskEvent::OpenTrack { .. } => EventKind::OpenTrack,
            TaskEvent::CloseTrack { .. } => EventKind::CloseTrack,
            TaskEvent::AddTask { .. } => EventKind::AddTask,
            TaskEvent::RemoveTask { .. } => EventKind::RemoveTask,
            TaskEvent::UpdateTask { .. } => EventKind::UpdateTask,
        }
    }

    pub fn root(&self) -> TaskId {
        match self {
            TaskEvent::OpenTrack { root, .. }
            | TaskEvent::CloseTrack { root, .. }
            | TaskEvent::AddTask { root, .. }
            | TaskEvent::RemoveTask { root, .. }
            | TaskEvent::UpdateTask { root, .. } => *root,
        }
    }
}

pub type Observer = Box<dyn FnMut(&TaskEvent) + Send + Sync>;

/// Registered observers, filtered by event kind.
#[derive(Default)]
pub(crate) struct Observers {
    entries: Vec<(Option<EventKind>, Observer)>,
}

impl Observers {
    pub(crate) fn push(&mut self, kind: Option<EventKind>, observer: Observer) {
        self.entries.push((kind, observer));
    }

    pub(crate) fn notify(&mut self, event: &TaskEvent) {
        let kind = event.kind();
        for (filter, observer) in &mut self.entries {
            if filter.map_or(true, |wanted| wanted == kind) {
                observer(event);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
