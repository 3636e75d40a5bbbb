// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Undo and redo of task tree mutations.
//!
//! Each [`TaskEvent`] knows the [`Mutation`] that reverts it. An [`UndoStack`]
//! observes a controller, records those inverses and replays them on demand.

use crate::control::controller::{InsertAt, TaskController};
use crate::control::events::TaskEvent;
use crate::errors::ControlError;
use crate::model::{Params, Task, TaskId};
use std::sync::{Arc, Mutex, MutexGuard};

/// A change that can be applied to a [`TaskController`].
#[derive(Debug, Clone)]
pub enum Mutation {
    OpenTrack { model: Vec<Task> },
    CloseTrack { root: TaskId },
    AddTask { root: TaskId, task: Task, at: InsertAt },
    RemoveTask { root: TaskId, task: TaskId },
    UpdateTask { root: TaskId, task: TaskId, fields: Params },
}

impl TaskEvent {
    /// The mutation restoring the state before this event.
    pub fn inverse(&self) -> Mutation {
        match self {
            TaskEvent::OpenTrack { root, .. } => Mutation::CloseTrack { root: *root },
            TaskEvent::CloseTrack { model, .. } => Mutation::OpenTrack {
                model: model.clone(),
            },
            TaskEvent::AddTask { root, task, .. } => Mutation::RemoveTask {
                root: *root,
                task: task.id(),
            },
            TaskEvent::RemoveTask {
                root, task, index, ..
            } => Mutation::AddTask {
                root: *root,
                task: task.clone(),
                at: InsertAt::At(*index),
            },
            TaskEvent::UpdateTask { root, task, old, .. } => Mutation::UpdateTask {
                root: *root,
                task: task.id(),
                fields: old.clone(),
            },
        }
    }
}

impl TaskController {
    /// Apply `mutation`, emitting the matching event.
    pub fn apply(&mut self, mutation: Mutation) -> Result<(), ControlError> {
        match mutation {
            Mutation::OpenTrack { model } => {
                let mut tasks = model.into_iter();
                let root = tasks.next().ok_or_else(|| ControlError::InvalidTask {
                    tasktype: String::new(),
                    reason: "a chain needs at least a root".to_string(),
                })?;
                self.open_track(root, tasks).map(|_| ())
            }
            Mutation::CloseTrack { root } => self.close_track(root).map(|_| ()),
            Mutation::AddTask { root, task, at } => self.add_task(root, task, at).map(|_| ()),
            Mutation::RemoveTask { root, task } => self.remove_task(root, task).map(|_| ()),
            Mutation::UpdateTask { root, task, fields } => {
                self.update_task(root, task, &fields).map(|_| ())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Replay {
    #[default]
    Idle,
    Undoing,
    Redoing,
}

#[derive(Debug, Default)]
struct History {
    undo: Vec<Mutation>,
    redo: Vec<Mutation>,
    replay: Replay,
}

/// Undo and redo stacks fed by a controller's events.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    history: Arc<Mutex<History>>,
}

impl UndoStack {
    /// Create a stack recording every mutation of `ctrl`.
    pub fn attach(ctrl: &mut TaskController) -> Self {
        let stack = Self::default();
        let history = stack.history.clone();
        ctrl.observe_all(move |event| {
            let mut history = history.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let inverse = event.inverse();
            match history.replay {
                Replay::Idle => {
                    history.undo.push(inverse);
                    history.redo.clear();
                }
                Replay::Undoing => history.redo.push(inverse),
                Replay::Redoing => history.undo.push(inverse),
            }
        });
        stack
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn can_undo(&self) -> bool {
        !self.lock().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.lock().redo.is_empty()
    }

    /// Revert the latest mutation. Returns `false` if there was nothing to revert.
    pub fn undo(&self, ctrl: &mut TaskController) -> Result<bool, ControlError> {
        self.replay(ctrl, Replay::Undoing)
    }

    /// Re-apply the latest reverted mutation.
    pub fn redo(&self, ctrl: &mut TaskController) -> Result<bool, ControlError> {
        self.replay(ctrl, Replay::Redoing)
    }

    fn replay(&self, ctrl: &mut TaskController, mode: Replay) -> Result<bool, ControlError> {
        let mutation = {
            let mut history = self.lock();
            let stack = match mode {
                Replay::Redoing => &mut history.redo,
                _ => &mut history.undo,
            };
            let Some(mutation) = stack.pop() else {
                return Ok(false);
            };
            history.replay = mode;
            mutation
        };

        let result = ctrl.apply(mutation);
        self.lock().replay = Replay::Idle;
        result.map(|_| true)
    }
}
