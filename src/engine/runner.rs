// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lazy pipeline construction.
//!
//! A [`Runner`] walks the stages of a chain in order and lets each processor
//! stack its work on the frame stream built so far. Nothing is computed while
//! the runner walks: the stream it returns is evaluated when frames are iterated.

use crate::config::EngineSettings;
use crate::engine::cache::{CacheHandle, CacheSlot, KeyedStore};
use crate::engine::frame::{Action, Frame, FrameStream};
use crate::errors::{ControlError, ProcessorError};
use crate::model::{Key, Level, Record, Task};
use crate::observability::messages::runner::{ClosureRejected, PipelineBuilt};
use crate::observability::messages::StructuredLog;
use crate::traits::Processor;
use std::any::Any;
use std::sync::Arc;

/// One position of a chain: the task, the processor for its type and its cache.
#[derive(Clone)]
pub struct Stage {
    pub task: Task,
    pub processor: Arc<dyn Processor>,
    pub slot: CacheSlot,
}

impl Stage {
    /// A stage with an empty, private cache slot.
    pub fn new(task: Task, processor: Arc<dyn Processor>) -> Self {
        Self {
            task,
            processor,
            slot: CacheSlot::new(),
        }
    }

    pub fn can_pool(&self) -> bool {
        self.processor.can_pool(&self.task)
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("task", &self.task)
            .field("slot", &self.slot)
            .finish()
    }
}

pub struct Runner {
    stages: Vec<Stage>,
    settings: EngineSettings,
    frames: Option<FrameStream>,
    start: usize,
    current: usize,
    level: Level,
}

impl Runner {
    pub fn new(stages: Vec<Stage>, settings: EngineSettings) -> Self {
        Self {
            stages,
            settings,
            frames: None,
            start: 0,
            current: 0,
            level: Level::None,
        }
    }

    /// Start from already computed `frames`, skipping the first `start` stages.
    pub fn with_start<I>(mut self, frames: I, start: usize) -> Self
    where
        I: IntoIterator<Item = Frame>,
        I::IntoIter: Send + 'static,
    {
        self.frames = Some(Box::new(frames.into_iter()));
        self.start = start.min(self.stages.len());
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Tasks of the pipeline, up to and including the target.
    pub fn model(&self) -> impl Iterator<Item = &Task> {
        self.stages.iter().map(|stage| &stage.task)
    }

    /// Task whose processor is currently extending the pipeline.
    pub fn task(&self) -> Option<&Task> {
        self.stages.get(self.current).map(|stage| &stage.task)
    }

    /// Granularity of the frames after the stages processed so far.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Let every enabled stage extend the pipeline, then hand the stream over.
    pub fn run(mut self) -> Result<FrameStream, ControlError> {
        let mut skipped = 0;
        for index in self.start..self.stages.len() {
            let stage = self.stages[index].clone();
            if stage.task.is_disabled() {
                skipped += 1;
                continue;
            }
            self.current = index;
            stage.processor.run(&stage.task, &mut self)?;
            if stage.task.level() != Level::None {
                self.level = stage.task.level();
            }
        }

        let target = self.model().last().map(Task::to_string).unwrap_or_default();
        PipelineBuilt {
            target: &target,
            stage_count: self.stages.len() - self.start,
            skipped,
            level: self.level(),
        }
        .log();

        Ok(self
            .frames
            .take()
            .unwrap_or_else(|| Box::new(std::iter::empty())))
    }

    /// Replace the frame stream. Used by root processors.
    pub fn set_source<I>(&mut self, frames: I)
    where
        I: IntoIterator<Item = Frame>,
        I::IntoIter: Send + 'static,
    {
        self.frames = Some(Box::new(frames.into_iter()));
    }

    /// Map every frame of the stream through `fcn`.
    pub fn apply<F>(&mut self, fcn: F) -> Result<(), ControlError>
    where
        F: Fn(Frame) -> Frame + Send + Sync + 'static,
    {
        self.check_closure(&fcn)?;
        self.map_frames(fcn);
        Ok(())
    }

    /// Stack a per-item action on every frame of the stream.
    pub fn with_action<F>(&mut self, action: F) -> Result<(), ControlError>
    where
        F: Fn(Key, Record) -> Result<Record, ProcessorError> + Send + Sync + 'static,
    {
        self.check_closure(&action)?;
        let action: Action = Arc::new(action);
        self.map_frames(move |frame| frame.with_action(action.clone()));
        Ok(())
    }

    /// Stack a per-item action whose results are kept in this stage's cache.
    ///
    /// Everything stacked so far, this action included, is computed at most once
    /// per key until the cache is invalidated.
    pub fn cached_action<F>(&mut self, action: F) -> Result<Arc<KeyedStore>, ControlError>
    where
        F: Fn(Key, Record) -> Result<Record, ProcessorError> + Send + Sync + 'static,
    {
        self.check_closure(&action)?;
        let store = self.set_cache_default(KeyedStore::default)?;
        let action: Action = Arc::new(action);
        let shared = store.clone();
        self.map_frames(move |frame| cache_frame(frame.with_action(action.clone()), shared.clone()));
        Ok(store)
    }

    /// Cached value of the current stage, seeded with `make()` if empty.
    pub fn set_cache_default<T, F>(&mut self, make: F) -> Result<Arc<T>, ControlError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let stage = &self.stages[self.current];
        stage
            .slot
            .set_default_with(make)
            .ok_or(ControlError::CacheType(stage.task.id()))
    }

    pub fn set_cache<T: Any + Send + Sync>(&mut self, value: T) -> CacheHandle {
        self.stages[self.current].slot.set(value)
    }

    pub fn cache(&self) -> CacheHandle {
        self.stages[self.current].slot.handle()
    }

    /// Refuse closures carrying more inline state than the configured limit.
    ///
    /// The `'static` bound already keeps closures from borrowing tasks or
    /// processors; the size limit catches large values moved in by accident.
    pub fn check_closure<F>(&self, closure: &F) -> Result<(), ControlError>
    where
        F: Send + Sync + 'static,
    {
        let size = std::mem::size_of_val(closure);
        let limit = self.settings.max_closure_bytes;
        if size <= limit {
            return Ok(());
        }

        let processor = self
            .task()
            .map(|task| task.tasktype().to_string())
            .unwrap_or_default();
        ClosureRejected {
            processor: &processor,
            size,
            limit,
        }
        .log();
        Err(ControlError::ClosureCapture {
            processor,
            size,
            limit,
        })
    }

    fn map_frames<F>(&mut self, fcn: F)
    where
        F: Fn(Frame) -> Frame + Send + 'static,
    {
        if let Some(frames) = self.frames.take() {
            self.frames = Some(Box::new(frames.map(fcn)));
        }
    }
}

/// Fold the actions of `frame` into one that reads and fills `store`.
fn cache_frame(frame: Frame, store: Arc<KeyedStore>) -> Frame {
    let Some(compute) = frame.composed() else {
        return frame;
    };
    let name = frame.name().to_string();
    let cached: Action = Arc::new(move |key, record| {
        if let Some(hit) = store.get(&name, key) {
            return Ok(hit);
        }
        let record = compute(key, record)?;
        store.insert(&name, key, record.clone());
        Ok(record)
    });
    frame.replace_actions(cached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{BulkyStep, CountingStep, StubRoot};
    use crate::errors::FailureStrategy;
    use crate::model::Level;

    fn stage(task: Task, processor: Arc<dyn Processor>) -> Stage {
        Stage::new(task, processor)
    }

    fn materialize(stream: FrameStream) -> Vec<Vec<(Key, Vec<f64>)>> {
        stream
            .map(|frame| {
                frame
                    .materialize(FailureStrategy::ContinueOnError)
                    .unwrap()
                    .values()
            })
            .collect()
    }

    #[test]
    fn test_run_builds_lazily_and_computes_on_iteration() {
        let step = Arc::new(CountingStep::new("step"));
        let stages = vec![
            stage(Task::root("stub_root").with_param("nbeads", 3), Arc::new(StubRoot)),
            stage(Task::new("step", Level::Bead), step.clone()),
        ];

        let stream = Runner::new(stages, EngineSettings::default()).run().unwrap();
        assert_eq!(step.calls(), 0);

        let frames = materialize(stream);
        assert_eq!(frames, vec![vec![(0, vec![1.0]), (1, vec![2.0]), (2, vec![3.0])]]);
        assert_eq!(step.calls(), 3);
    }

    #[test]
    fn test_disabled_stages_are_skipped() {
        let step = Arc::new(CountingStep::new("step"));
        let stages = vec![
            stage(Task::root("stub_root").with_param("nbeads", 2), Arc::new(StubRoot)),
            stage(Task::new("step", Level::Bead).with_disabled(true), step.clone()),
        ];

        let frames = materialize(Runner::new(stages, EngineSettings::default()).run().unwrap());
        assert_eq!(frames, vec![vec![(0, vec![0.0]), (1, vec![1.0])]]);
        assert_eq!(step.calls(), 0);
    }

    #[test]
    fn test_cached_action_computes_once_per_key() {
        let step = Arc::new(CountingStep::new("step"));
        let stages = vec![
            stage(Task::root("stub_root").with_param("nbeads", 4), Arc::new(StubRoot)),
            stage(Task::new("step", Level::Bead), step.clone()),
        ];

        for _ in 0..3 {
            let runner = Runner::new(stages.clone(), EngineSettings::default());
            materialize(runner.run().unwrap());
        }
        assert_eq!(step.calls(), 4);

        let store = stages[1].slot.handle().get_as::<KeyedStore>().unwrap();
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_oversized_closure_is_rejected() {
        let stages = vec![
            stage(Task::root("stub_root"), Arc::new(StubRoot)),
            stage(Task::new("bulky", Level::Bead), Arc::new(BulkyStep)),
        ];

        let err = Runner::new(stages.clone(), EngineSettings::default())
            .run()
            .err()
            .unwrap();
        match err {
            ControlError::ClosureCapture {
                processor, limit, ..
            } => {
                assert_eq!(processor, "bulky");
                assert_eq!(limit, EngineSettings::default().max_closure_bytes);
            }
            other => panic!("unexpected error: {other}"),
        }

        let relaxed = EngineSettings {
            max_closure_bytes: 1 << 16,
            ..EngineSettings::default()
        };
        assert!(Runner::new(stages, relaxed).run().is_ok());
    }

    #[test]
    fn test_cache_type_mismatch_is_reported() {
        let step = Arc::new(CountingStep::new("step"));
        let task = Task::new("step", Level::Bead);
        let id = task.id();
        let conflicting = stage(task, step);
        conflicting.slot.set("not a keyed store");

        let stages = vec![
            stage(Task::root("stub_root"), Arc::new(StubRoot)),
            conflicting,
        ];
        let err = Runner::new(stages, EngineSettings::default()).run().err().unwrap();
        assert!(matches!(err, ControlError::CacheType(task) if task == id));
    }

    #[test]
    fn test_with_start_skips_computed_prefix() {
        let root = Arc::new(StubRoot);
        let step = Arc::new(CountingStep::new("step"));
        let stages = vec![
            stage(Task::root("stub_root").with_param("nbeads", 8), root),
            stage(Task::new("step", Level::Bead), step.clone()),
        ];
        let start = Frame::from_items("computed", vec![(7, Record::new(vec![10.0]))]);

        let runner = Runner::new(stages, EngineSettings::default()).with_start(vec![start], 1);
        let frames = materialize(runner.run().unwrap());
        assert_eq!(frames, vec![vec![(7, vec![11.0])]]);
        assert_eq!(step.calls(), 1);
    }
}
