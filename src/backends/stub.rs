// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::ProcessorMap;
use crate::engine::{DataSource, Frame, MemorySource, Runner};
use crate::errors::{ControlError, ProcessorError};
use crate::model::{Key, Record, Task};
use crate::traits::Processor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Root producing one frame named "stub" where item `k` is `[k]`.
///
/// Counts as slow unless the task sets `slow: false`.
pub struct StubRoot;

impl Processor for StubRoot {
    fn tasktype(&self) -> &'static str {
        "stub_root"
    }

    fn run(&self, task: &Task, args: &mut Runner) -> Result<(), ControlError> {
        let nbeads = task.param("nbeads").and_then(|v| v.as_u64()).unwrap_or(4) as Key;
        let source = args.set_cache_default(|| {
            MemorySource::new(
                (0..nbeads)
                    .map(|key| (key, Record::new(vec![f64::from(key)])))
                    .collect(),
            )
        })?;
        let source: Arc<dyn DataSource> = source;
        args.set_source(std::iter::once(Frame::new("stub", source)));
        Ok(())
    }

    fn can_pool(&self, _task: &Task) -> bool {
        true
    }

    fn is_slow(&self, task: &Task) -> bool {
        task.param("slow").and_then(|v| v.as_bool()).unwrap_or(true)
    }
}

/// Step adding `shift` (default 1) to every value, counting each computation.
///
/// Results are cached per key. Each item records the step in its trail and the
/// thread that computed it under `<tasktype>_thread`.
pub struct CountingStep {
    tasktype: &'static str,
    poolable: bool,
    calls: Arc<AtomicUsize>,
}

impl CountingStep {
    pub fn new(tasktype: &'static str) -> Self {
        Self {
            tasktype,
            poolable: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn poolable(mut self) -> Self {
        self.poolable = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Processor for CountingStep {
    fn tasktype(&self) -> &'static str {
        self.tasktype
    }

    fn run(&self, task: &Task, args: &mut Runner) -> Result<(), ControlError> {
        let shift = task.param("shift").and_then(|v| v.as_f64()).unwrap_or(1.0);
        let calls = self.calls.clone();
        let tasktype = self.tasktype;
        args.cached_action(move |_, mut record| {
            calls.fetch_add(1, Ordering::SeqCst);
            record.values.iter_mut().for_each(|v| *v += shift);
            record.push_trail(tasktype);
            record.mark(
                format!("{tasktype}_thread"),
                format!("{:?}", std::thread::current().id()),
            );
            Ok(record)
        })?;
        Ok(())
    }

    fn can_pool(&self, _task: &Task) -> bool {
        self.poolable
    }
}

/// Step failing on the keys listed in its `keys` parameter.
pub struct FailingStep;

impl Processor for FailingStep {
    fn tasktype(&self) -> &'static str {
        "failing"
    }

    fn run(&self, task: &Task, args: &mut Runner) -> Result<(), ControlError> {
        let keys: Vec<Key> = task
            .param("keys")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        args.with_action(move |key, record| {
            if keys.contains(&key) {
                Err(ProcessorError::new("failing", "simulated failure"))
            } else {
                Ok(record)
            }
        })
    }

    fn can_pool(&self, _task: &Task) -> bool {
        true
    }
}

/// Step whose action carries far more inline state than allowed by default.
pub struct BulkyStep;

impl Processor for BulkyStep {
    fn tasktype(&self) -> &'static str {
        "bulky"
    }

    fn run(&self, _task: &Task, args: &mut Runner) -> Result<(), ControlError> {
        let table = [0u8; 4096];
        args.with_action(move |key, record| {
            let _ = table[key as usize % table.len()];
            Ok(record)
        })
    }
}

/// Step replacing its cache with a fresh build count every time a pipeline
/// through it is built.
#[derive(Default)]
pub struct RebuildCounter {
    builds: Arc<AtomicUsize>,
}

impl Processor for RebuildCounter {
    fn tasktype(&self) -> &'static str {
        "rebuilds"
    }

    fn run(&self, _task: &Task, args: &mut Runner) -> Result<(), ControlError> {
        let builds = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        args.set_cache(builds);
        Ok(())
    }
}

/// Registry with the stub root, counting steps "a" to "d", `failing`, `bulky`
/// and `rebuilds`, then `extra` replacing any of those by task type.
pub fn stub_registry(extra: Vec<Arc<dyn Processor>>) -> ProcessorMap {
    let mut map = ProcessorMap::new();
    map.register(Arc::new(StubRoot));
    for tasktype in ["a", "b", "c", "d"] {
        map.register(Arc::new(CountingStep::new(tasktype)));
    }
    map.register(Arc::new(FailingStep));
    map.register(Arc::new(BulkyStep));
    map.register(Arc::new(RebuildCounter::default()));
    for processor in extra {
        map.register(processor);
    }
    map
}
