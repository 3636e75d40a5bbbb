// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The task tree: open chains, their processors and their caches.

use crate::config::{EngineSettings, ProcessorMap};
use crate::control::events::{EventKind, Observer, Observers, TaskEvent};
use crate::control::order::TaskOrder;
use crate::engine::{CacheHandle, CacheSlot, FrameStream, Runner, Stage};
use crate::errors::ControlError;
use crate::model::{AsTaskId, Params, Task, TaskId, TaskSnapshot};
use crate::observability::messages::control::{
    CacheInvalidated, MutationKind, TaskMutated, TrackClosed, TrackOpened,
};
use crate::observability::messages::StructuredLog;
use crate::traits::Processor;
use std::collections::HashSet;
use std::sync::Arc;

/// Where [`TaskController::add_task`] inserts a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    /// After the last task
    End,
    /// At this position; 0 is reserved for the root
    At(usize),
    /// Where the controller's [`TaskOrder`] puts tasks of this type
    Auto,
}

/// One open chain. The three vectors are kept the same length.
struct Chain {
    tasks: Vec<Task>,
    processors: Vec<Arc<dyn Processor>>,
    slots: Vec<CacheSlot>,
}

impl Chain {
    fn root(&self) -> TaskId {
        self.tasks[0].id()
    }

    fn position(&self, task: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id() == task)
    }

    fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(Task::id).collect()
    }

    fn push(&mut self, task: Task, processor: Arc<dyn Processor>) {
        self.insert(self.tasks.len(), task, processor);
    }

    fn insert(&mut self, index: usize, task: Task, processor: Arc<dyn Processor>) {
        self.tasks.insert(index, task);
        self.processors.insert(index, processor);
        self.slots.insert(index, CacheSlot::new());
    }

    fn remove(&mut self, index: usize) -> Task {
        self.processors.remove(index);
        self.slots.remove(index).clear();
        self.tasks.remove(index)
    }

    /// Clear the caches of every task from `from` on. Returns how many held data.
    fn invalidate(&self, from: usize) -> usize {
        self.slots
            .iter()
            .skip(from)
            .filter(|slot| slot.clear())
            .count()
    }

    fn stages(&self, count: usize) -> Vec<Stage> {
        self.tasks
            .iter()
            .zip(&self.processors)
            .zip(&self.slots)
            .take(count)
            .map(|((task, processor), slot)| Stage {
                task: task.clone(),
                processor: processor.clone(),
                slot: slot.clone(),
            })
            .collect()
    }
}

/// Owns every open chain and keeps their caches consistent with their tasks.
///
/// Any mutation of a chain clears the caches of the mutated position and of
/// every position after it, and leaves the caches before it untouched.
pub struct TaskController {
    chains: Vec<Chain>,
    processors: ProcessorMap,
    settings: EngineSettings,
    order: TaskOrder,
    observers: Observers,
}

impl TaskController {
    pub fn new(processors: ProcessorMap) -> Self {
        Self {
            chains: Vec::new(),
            processors,
            settings: EngineSettings::default(),
            order: TaskOrder::default(),
            observers: Observers::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_task_order(mut self, order: TaskOrder) -> Self {
        self.order = order;
        self
    }

    pub fn processors(&self) -> &ProcessorMap {
        &self.processors
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn task_order(&self) -> &TaskOrder {
        &self.order
    }

    /// Call `observer` for every event of `kind`.
    pub fn observe<F>(&mut self, kind: EventKind, observer: F)
    where
        F: FnMut(&TaskEvent) + Send + Sync + 'static,
    {
        self.observers.push(Some(kind), Box::new(observer));
    }

    /// Call `observer` for every event.
    pub fn observe_all<F>(&mut self, observer: F)
    where
        F: FnMut(&TaskEvent) + Send + Sync + 'static,
    {
        self.observers.push(None, Box::new(observer) as Observer);
    }

    fn emit(&mut self, event: TaskEvent) {
        self.observers.notify(&event);
    }

    fn chain(&self, root: TaskId) -> Result<&Chain, ControlError> {
        self.chains
            .iter()
            .find(|chain| chain.root() == root)
            .ok_or(ControlError::MissingRoot(root))
    }

    fn chain_mut(&mut self, root: TaskId) -> Result<&mut Chain, ControlError> {
        self.chains
            .iter_mut()
            .find(|chain| chain.root() == root)
            .ok_or(ControlError::MissingRoot(root))
    }

    fn locate(&self, root: TaskId, task: TaskId) -> Result<usize, ControlError> {
        self.chain(root)?
            .position(task)
            .ok_or(ControlError::MissingTask { root, task })
    }

    fn step_processor(&self, task: &Task) -> Result<Arc<dyn Processor>, ControlError> {
        if task.is_root() {
            return Err(ControlError::InvalidTask {
                tasktype: task.tasktype().to_string(),
                reason: "a root task can only start a chain".to_string(),
            });
        }
        self.processors.resolve(task.tasktype())
    }

    /// Open a chain starting at `root`, followed by `tasks` in order.
    pub fn open_track(
        &mut self,
        root: Task,
        tasks: impl IntoIterator<Item = Task>,
    ) -> Result<TaskId, ControlError> {
        let root_id = root.id();
        if !root.is_root() {
            return Err(ControlError::NotARoot(root_id));
        }
        if self.is_open(root_id) {
            return Err(ControlError::DuplicateRoot(root_id));
        }

        let mut chain = Chain {
            tasks: Vec::new(),
            processors: Vec::new(),
            slots: Vec::new(),
        };
        let mut seen = HashSet::from([root_id]);
        let processor = self.processors.resolve(root.tasktype())?;
        chain.push(root, processor);

        for task in tasks {
            if !seen.insert(task.id()) {
                return Err(ControlError::DuplicateTask {
                    root: root_id,
                    task: task.id(),
                });
            }
            let processor = self.step_processor(&task)?;
            chain.push(task, processor);
        }

        TrackOpened {
            root: root_id,
            task_count: chain.tasks.len(),
        }
        .log();
        let model = chain.tasks.clone();
        self.chains.push(chain);
        self.emit(TaskEvent::OpenTrack {
            root: root_id,
            model,
        });
        Ok(root_id)
    }

    /// Open a chain from stored snapshots, the first one being the root.
    ///
    /// Every task gets a fresh identity.
    pub fn open_snapshot(&mut self, snapshots: &[TaskSnapshot]) -> Result<TaskId, ControlError> {
        let Some((root, tasks)) = snapshots.split_first() else {
            return Err(ControlError::InvalidTask {
                tasktype: String::new(),
                reason: "a chain needs at least a root".to_string(),
            });
        };
        self.open_track(root.restore(), tasks.iter().map(TaskSnapshot::restore))
    }

    /// Close the chain of `root`, dropping its caches. Returns its tasks.
    pub fn close_track(&mut self, root: impl AsTaskId) -> Result<Vec<Task>, ControlError> {
        let root = root.task_id();
        let index = self
            .chains
            .iter()
            .position(|chain| chain.root() == root)
            .ok_or(ControlError::MissingRoot(root))?;

        let chain = self.chains.remove(index);
        chain.invalidate(0);
        TrackClosed { root }.log();
        self.emit(TaskEvent::CloseTrack {
            root,
            model: chain.tasks.clone(),
        });
        Ok(chain.tasks)
    }

    /// Insert `task` into the chain of `root`. Returns the position it landed at.
    pub fn add_task(
        &mut self,
        root: impl AsTaskId,
        task: Task,
        at: InsertAt,
    ) -> Result<usize, ControlError> {
        let root = root.task_id();
        let processor = self.step_processor(&task)?;
        let order = &self.order;
        let chain = self.chains
            .iter_mut()
            .find(|chain| chain.root() == root)
            .ok_or(ControlError::MissingRoot(root))?;

        if chain.position(task.id()).is_some() {
            return Err(ControlError::DuplicateTask {
                root,
                task: task.id(),
            });
        }
        let len = chain.tasks.len();
        let index = match at {
            InsertAt::End => len,
            InsertAt::At(0) => return Err(ControlError::RootIsFixed(root)),
            InsertAt::At(index) if index > len => {
                return Err(ControlError::InvalidIndex { index, len })
            }
            InsertAt::At(index) => index,
            InsertAt::Auto => order.index_for(&chain.tasks, task.tasktype()),
        };

        let old = chain.ids();
        let cleared = chain.invalidate(index);
        chain.insert(index, task.clone(), processor);

        self.log_mutation(MutationKind::Add, root, task.id(), index, cleared);
        self.emit(TaskEvent::AddTask {
            root,
            task,
            index,
            old,
        });
        Ok(index)
    }

    /// Remove `task` from the chain of `root`. The root itself cannot be removed.
    pub fn remove_task(
        &mut self,
        root: impl AsTaskId,
        task: impl AsTaskId,
    ) -> Result<Task, ControlError> {
        let (root, task) = (root.task_id(), task.task_id());
        let index = self.locate(root, task)?;
        if index == 0 {
            return Err(ControlError::RootIsFixed(root));
        }

        let chain = self.chain_mut(root)?;
        let old = chain.ids();
        let cleared = chain.invalidate(index);
        let removed = chain.remove(index);

        self.log_mutation(MutationKind::Remove, root, task, index, cleared);
        self.emit(TaskEvent::RemoveTask {
            root,
            task: removed.clone(),
            index,
            old,
        });
        Ok(removed)
    }

    /// Update fields of `task`. Returns the values they replaced.
    pub fn update_task(
        &mut self,
        root: impl AsTaskId,
        task: impl AsTaskId,
        fields: &Params,
    ) -> Result<Params, ControlError> {
        let (root, task) = (root.task_id(), task.task_id());
        let index = self.locate(root, task)?;

        let chain = self.chain_mut(root)?;
        let cleared = chain.invalidate(index);
        let old = chain.tasks[index].update(fields);
        let updated = chain.tasks[index].clone();

        self.log_mutation(MutationKind::Update, root, task, index, cleared);
        self.emit(TaskEvent::UpdateTask {
            root,
            task: updated,
            old: old.clone(),
            new: fields.clone(),
        });
        Ok(old)
    }

    fn log_mutation(
        &self,
        kind: MutationKind,
        root: TaskId,
        task: TaskId,
        index: usize,
        cleared: usize,
    ) {
        TaskMutated {
            kind,
            root,
            task,
            index,
        }
        .log();
        if cleared > 0 {
            CacheInvalidated {
                root,
                from_index: index,
                cleared,
            }
            .log();
        }
    }

    /// Clear the caches of the chain of `root`, from `from` on (everything if `None`).
    pub fn clear_data(
        &self,
        root: impl AsTaskId,
        from: Option<TaskId>,
    ) -> Result<usize, ControlError> {
        let root = root.task_id();
        let index = match from {
            Some(task) => self.locate(root, task)?,
            None => 0,
        };
        let cleared = self.chain(root)?.invalidate(index);
        if cleared > 0 {
            CacheInvalidated {
                root,
                from_index: index,
                cleared,
            }
            .log();
        }
        Ok(cleared)
    }

    /// Stages of the chain of `root`, up to and including `upto` (all if `None`).
    pub fn stages(&self, root: impl AsTaskId, upto: Option<TaskId>) -> Result<Vec<Stage>, ControlError> {
        let root = root.task_id();
        let chain = self.chain(root)?;
        let count = match upto {
            Some(task) => {
                chain
                    .position(task)
                    .ok_or(ControlError::MissingTask { root, task })?
                    + 1
            }
            None => chain.tasks.len(),
        };
        Ok(chain.stages(count))
    }

    /// Lazy frames produced by the chain of `root` up to and including `task`.
    pub fn run(&self, root: impl AsTaskId, task: impl AsTaskId) -> Result<FrameStream, ControlError> {
        let stages = self.stages(root, Some(task.task_id()))?;
        Runner::new(stages, self.settings).run()
    }

    /// Lazy frames produced by the whole chain of `root`.
    pub fn run_all(&self, root: impl AsTaskId) -> Result<FrameStream, ControlError> {
        let stages = self.stages(root, None)?;
        Runner::new(stages, self.settings).run()
    }

    /// Accessor to the cache of `task`, `None` once it is invalidated.
    pub fn cache(&self, root: impl AsTaskId, task: impl AsTaskId) -> Result<CacheHandle, ControlError> {
        let root = root.task_id();
        let index = self.locate(root, task.task_id())?;
        Ok(self.chain(root)?.slots[index].handle())
    }

    pub fn is_open(&self, root: impl AsTaskId) -> bool {
        let root = root.task_id();
        self.chains.iter().any(|chain| chain.root() == root)
    }

    /// Roots of the open chains, in opening order.
    pub fn roots(&self) -> Vec<TaskId> {
        self.chains.iter().map(Chain::root).collect()
    }

    pub fn tasklist(&self, root: impl AsTaskId) -> Result<&[Task], ControlError> {
        Ok(&self.chain(root.task_id())?.tasks)
    }

    /// Every open chain, in opening order.
    pub fn tasktree(&self) -> impl Iterator<Item = &[Task]> {
        self.chains.iter().map(|chain| chain.tasks.as_slice())
    }

    pub fn task(&self, root: impl AsTaskId, task: impl AsTaskId) -> Result<&Task, ControlError> {
        let root = root.task_id();
        let index = self.locate(root, task.task_id())?;
        Ok(&self.chain(root)?.tasks[index])
    }

    /// Serializable form of the chain of `root`.
    pub fn snapshot(&self, root: impl AsTaskId) -> Result<Vec<TaskSnapshot>, ControlError> {
        Ok(self
            .tasklist(root)?
            .iter()
            .map(Task::snapshot)
            .collect())
    }
}

impl std::fmt::Debug for TaskController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskController")
            .field("roots", &self.roots())
            .field("processors", &self.processors)
            .field("observers", &self.observers.len())
            .finish()
    }
}
