// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pooled execution of several chains.
//!
//! Each chain is cut in two at its first enabled stage whose processor refuses
//! pooling. The prefix runs on a pool worker and comes back materialized; the
//! suffix runs on the orchestrator, starting from the prefix output. Chains
//! whose root refuses pooling run entirely on the orchestrator.
//!
//! Roots are handed to workers in contiguous chunks (see [`poolchunk`]) and the
//! outputs are returned in the order the roots were given, so a pooled run yields
//! the same frames as [`run_serial`]. When no enabled stage of any chain is slow,
//! the pool is bypassed and the chains run serially.

use crate::config::{EngineSettings, ProcessorMap};
use crate::control::TaskController;
use crate::engine::cache::KeyedStore;
use crate::engine::frame::{FrameOutput, FrameStream};
use crate::engine::pool::{poolchunk, WorkerPayload};
use crate::engine::runner::{Runner, Stage};
use crate::errors::{ControlError, FailureStrategy};
use crate::model::{Key, TaskId, TaskSnapshot};
use crate::observability::messages::pool::{
    CacheMerged, PoolBypassed, PooledRunCompleted, PooledRunStarted, WorkerChunkAssigned,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Isolation, Job, WorkerPool};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Metadata entry naming the worker that computed an item.
pub const WORKER_MARK: &str = "worker";

/// Materialized frames of one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct RootOutput {
    pub root: TaskId,
    pub frames: Vec<FrameOutput>,
}

impl RootOutput {
    pub fn item_count(&self) -> usize {
        self.frames.iter().map(|frame| frame.items.len()).sum()
    }

    /// Primary values only, leaving auxiliary metadata out.
    pub fn values(&self) -> Vec<(String, Vec<(Key, Vec<f64>)>)> {
        self.frames
            .iter()
            .map(|frame| (frame.name.clone(), frame.values()))
            .collect()
    }
}

/// Chain prefix in the form sent to isolated workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteJob {
    pub tasks: Vec<TaskSnapshot>,
    /// Keyed caches already computed on the orchestrator, by stage position
    #[serde(default)]
    pub caches: Vec<(usize, Vec<FrameOutput>)>,
}

/// What an isolated worker sends back for one chain.
#[derive(Debug, Serialize, Deserialize)]
struct RemoteOutput {
    frames: Vec<FrameOutput>,
    /// Keyed caches filled by the worker, by stage position
    caches: Vec<(usize, Vec<FrameOutput>)>,
}

/// Work sent to a pool for one chain.
pub enum WorkerInput {
    /// Live stages, for pools sharing memory with the orchestrator
    Live(Vec<Stage>),
    /// Snapshots, for isolated pools
    Remote(RemoteJob),
}

struct RootPlan {
    root: TaskId,
    stages: Vec<Stage>,
    boundary: usize,
}

/// Contents of the keyed store held by `stage`, if any.
fn keyed_frames(stage: &Stage) -> Option<Vec<FrameOutput>> {
    let store = stage.slot.get()?.downcast::<KeyedStore>().ok()?;
    let frames = store
        .frames()
        .into_iter()
        .map(|name| FrameOutput {
            items: store.items(&name),
            name,
        })
        .collect();
    Some(frames)
}

fn keyed_caches(stages: &[Stage]) -> Vec<(usize, Vec<FrameOutput>)> {
    stages
        .iter()
        .enumerate()
        .filter_map(|(position, stage)| Some((position, keyed_frames(stage)?)))
        .collect()
}

/// Fill the keyed stores of `stages` with `caches`, skipping slots of another type.
fn seed_caches(stages: &[Stage], caches: Vec<(usize, Vec<FrameOutput>)>) -> usize {
    let mut items = 0;
    for (position, frames) in caches {
        let Some(stage) = stages.get(position) else {
            continue;
        };
        let Some(store) = stage.slot.set_default_with(KeyedStore::default) else {
            tracing::debug!(task = %stage.task, "cache holds another type, not seeding");
            continue;
        };
        for frame in frames {
            items += frame.items.len();
            store.extend(&frame.name, frame.items);
        }
    }
    items
}

/// Whether any enabled stage is expensive enough to be worth a pool.
fn any_slow(stages: &[Stage]) -> bool {
    stages
        .iter()
        .any(|stage| !stage.task.is_disabled() && stage.processor.is_slow(&stage.task))
}

/// Length of the longest prefix of `stages` that may run on a worker.
pub fn remote_boundary(stages: &[Stage]) -> usize {
    stages
        .iter()
        .take_while(|stage| stage.task.is_disabled() || stage.can_pool())
        .count()
}

/// Prepare the worker input for the first `boundary` stages.
///
/// Isolated workers rebuild processors from `processors`, so every pooled task
/// type must be registered there and agree to pooling. A mismatch fails here,
/// before anything is dispatched. The keyed caches already filled for the prefix
/// travel with the snapshots so workers do not recompute them.
pub fn pooled_input(
    isolation: Isolation,
    stages: &[Stage],
    boundary: usize,
    processors: &ProcessorMap,
) -> Result<WorkerInput, ControlError> {
    let prefix = &stages[..boundary.min(stages.len())];
    if isolation == Isolation::Shared {
        return Ok(WorkerInput::Live(prefix.to_vec()));
    }

    for stage in prefix.iter().filter(|stage| !stage.task.is_disabled()) {
        let tasktype = stage.task.tasktype();
        let processor = processors
            .get(tasktype)
            .ok_or_else(|| ControlError::Unpoolable {
                processor: tasktype.to_string(),
                reason: "no processor of this type is registered for workers".to_string(),
            })?;
        if !processor.can_pool(&stage.task) {
            return Err(ControlError::Unpoolable {
                processor: tasktype.to_string(),
                reason: "the worker registry refuses pooling for this task".to_string(),
            });
        }
    }

    Ok(WorkerInput::Remote(RemoteJob {
        tasks: prefix.iter().map(|stage| stage.task.snapshot()).collect(),
        caches: keyed_caches(prefix),
    }))
}

fn collect(stream: FrameStream, strategy: FailureStrategy) -> Result<Vec<FrameOutput>, ControlError> {
    stream.map(|frame| frame.materialize(strategy)).collect()
}

fn mark_worker(mut frames: Vec<FrameOutput>, worker: usize) -> Vec<FrameOutput> {
    let worker = worker.to_string();
    for frame in &mut frames {
        for (_, record) in &mut frame.items {
            record.mark(WORKER_MARK, worker.clone());
        }
    }
    frames
}

fn run_live(stages: Vec<Stage>, settings: EngineSettings) -> Result<Vec<FrameOutput>, ControlError> {
    let stream = Runner::new(stages, settings).run()?;
    collect(stream, settings.failure_strategy)
}

fn run_remote(
    job: &RemoteJob,
    processors: &ProcessorMap,
    settings: EngineSettings,
) -> Result<RemoteOutput, ControlError> {
    let stages = job
        .tasks
        .iter()
        .map(|snapshot| {
            let task = snapshot.restore();
            let processor = processors.resolve(task.tasktype())?;
            Ok(Stage::new(task, processor))
        })
        .collect::<Result<Vec<_>, ControlError>>()?;

    seed_caches(&stages, job.caches.clone());
    let frames = run_live(stages.clone(), settings)?;
    Ok(RemoteOutput {
        frames,
        caches: keyed_caches(&stages),
    })
}

fn live_job(chunk: Vec<Vec<Stage>>, settings: EngineSettings) -> Job {
    Box::new(move |worker: usize| -> Result<WorkerPayload, ControlError> {
        WorkerChunkAssigned {
            worker,
            root_count: chunk.len(),
        }
        .log();
        let outputs = chunk
            .into_iter()
            .map(|stages| {
                let root = stages
                    .first()
                    .map(|stage| stage.task.id())
                    .ok_or_else(|| ControlError::WorkerFailed {
                        worker,
                        reason: "received an empty chain".to_string(),
                    })?;
                let frames = run_live(stages, settings)?;
                Ok(RootOutput { root, frames })
            })
            .collect::<Result<Vec<_>, ControlError>>()?;
        Ok(WorkerPayload::Roots(outputs))
    })
}

fn remote_job(encoded: Vec<u8>, processors: ProcessorMap, settings: EngineSettings) -> Job {
    Box::new(move |worker: usize| -> Result<WorkerPayload, ControlError> {
        let jobs: Vec<RemoteJob> = serde_json::from_slice(&encoded)?;
        WorkerChunkAssigned {
            worker,
            root_count: jobs.len(),
        }
        .log();
        let outputs = jobs
            .iter()
            .map(|job| run_remote(job, &processors, settings))
            .collect::<Result<Vec<_>, ControlError>>()?;
        Ok(WorkerPayload::Encoded(serde_json::to_vec(&outputs)?))
    })
}

/// Copy the keyed caches computed by an isolated worker into the live slots.
fn merge_worker_output(stages: &[Stage], caches: Vec<(usize, Vec<FrameOutput>)>) {
    let target = stages.last().map(|stage| stage.task.tasktype()).unwrap_or_default();
    let items = seed_caches(stages, caches);
    CacheMerged {
        tasktype: target,
        items,
    }
    .log();
}

/// Runs the chains of several roots on a [`WorkerPool`].
pub struct PooledRunner {
    pool: Arc<dyn WorkerPool>,
    processors: Option<ProcessorMap>,
}

impl PooledRunner {
    pub fn new(pool: Arc<dyn WorkerPool>) -> Self {
        Self {
            pool,
            processors: None,
        }
    }

    /// Registry isolated workers rebuild processors from.
    ///
    /// Defaults to the controller's own registry.
    pub fn with_processors(mut self, processors: ProcessorMap) -> Self {
        self.processors = Some(processors);
        self
    }

    pub fn pool(&self) -> &Arc<dyn WorkerPool> {
        &self.pool
    }

    /// Compute the full chains of `roots`, returning outputs in the same order.
    pub async fn run(
        &self,
        ctrl: &TaskController,
        roots: &[TaskId],
    ) -> Result<Vec<RootOutput>, ControlError> {
        let started = Instant::now();
        let settings = *ctrl.settings();
        let processors = self.processors.as_ref().unwrap_or(ctrl.processors());
        let isolation = self.pool.isolation();
        let nworkers = self.pool.nworkers();

        let plans = roots
            .iter()
            .map(|root| {
                let stages = ctrl.stages(*root, None)?;
                let boundary = remote_boundary(&stages);
                Ok(RootPlan {
                    root: *root,
                    stages,
                    boundary,
                })
            })
            .collect::<Result<Vec<_>, ControlError>>()?;

        if !plans.iter().any(|plan| any_slow(&plan.stages)) {
            PoolBypassed {
                pool: self.pool.name(),
                root_count: roots.len(),
            }
            .log();
            return run_serial(ctrl, roots);
        }

        PooledRunStarted {
            pool: self.pool.name(),
            nworkers,
            root_count: roots.len(),
        }
        .log();

        let pooled: Vec<usize> = (0..plans.len())
            .filter(|&index| plans[index].boundary > 0)
            .collect();
        let inputs = pooled
            .iter()
            .map(|&index| {
                let plan = &plans[index];
                pooled_input(isolation, &plan.stages, plan.boundary, processors)
            })
            .collect::<Result<Vec<_>, ControlError>>()?;

        let remote_frames = self
            .dispatch(inputs, nworkers, processors, settings, &plans, &pooled)
            .await?;

        let mut prefix_outputs: Vec<Option<(usize, Vec<FrameOutput>)>> = vec![None; plans.len()];
        for (index, prefix) in pooled.into_iter().zip(remote_frames) {
            prefix_outputs[index] = Some(prefix);
        }

        let mut outputs = Vec::with_capacity(plans.len());
        for (plan, prefix) in plans.into_iter().zip(prefix_outputs) {
            let RootPlan {
                root,
                stages,
                boundary,
            } = plan;
            let frames = match prefix {
                Some((worker, frames)) if boundary >= stages.len() => mark_worker(frames, worker),
                Some((worker, frames)) => {
                    // Marks go on the returned records only; the live caches stay unmarked.
                    let start = frames.into_iter().map(FrameOutput::into_frame);
                    let runner = Runner::new(stages, settings).with_start(start, boundary);
                    mark_worker(collect(runner.run()?, settings.failure_strategy)?, worker)
                }
                None => collect(
                    Runner::new(stages, settings).run()?,
                    settings.failure_strategy,
                )?,
            };
            outputs.push(RootOutput { root, frames });
        }

        PooledRunCompleted {
            pool: self.pool.name(),
            root_count: outputs.len(),
            item_count: outputs.iter().map(RootOutput::item_count).sum(),
            duration: started.elapsed(),
        }
        .log();
        Ok(outputs)
    }

    /// Send `inputs` to the pool and return the prefix frames in input order,
    /// each with the index of the worker that computed it.
    async fn dispatch(
        &self,
        inputs: Vec<WorkerInput>,
        nworkers: usize,
        processors: &ProcessorMap,
        settings: EngineSettings,
        plans: &[RootPlan],
        pooled: &[usize],
    ) -> Result<Vec<(usize, Vec<FrameOutput>)>, ControlError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut jobs: Vec<Job> = Vec::with_capacity(nworkers);
        let mut inputs = inputs.into_iter();
        let sizes: Vec<usize> = (0..nworkers)
            .map(|worker| poolchunk(pooled, nworkers, worker).len())
            .collect();

        for size in sizes {
            let chunk: Vec<WorkerInput> = inputs.by_ref().take(size).collect();
            let mut live = Vec::new();
            let mut remote = Vec::new();
            for input in chunk {
                match input {
                    WorkerInput::Live(stages) => live.push(stages),
                    WorkerInput::Remote(job) => remote.push(job),
                }
            }
            jobs.push(if remote.is_empty() {
                live_job(live, settings)
            } else {
                remote_job(serde_json::to_vec(&remote)?, processors.clone(), settings)
            });
        }

        let mut frames = Vec::with_capacity(pooled.len());
        for (worker, payload) in self.pool.map(jobs).await?.into_iter().enumerate() {
            match payload {
                WorkerPayload::Roots(outputs) => {
                    frames.extend(outputs.into_iter().map(|output| (worker, output.frames)))
                }
                WorkerPayload::Encoded(bytes) => {
                    let outputs: Vec<RemoteOutput> = serde_json::from_slice(&bytes)?;
                    for output in outputs {
                        let Some(&index) = pooled.get(frames.len()) else {
                            break;
                        };
                        merge_worker_output(&plans[index].stages, output.caches);
                        frames.push((worker, output.frames));
                    }
                }
            }
        }

        if frames.len() != pooled.len() {
            return Err(ControlError::WorkerFailed {
                worker: 0,
                reason: format!(
                    "expected output for {} roots, got {}",
                    pooled.len(),
                    frames.len()
                ),
            });
        }
        Ok(frames)
    }
}

/// Compute the full chains of `roots` on the calling thread.
pub fn run_serial(ctrl: &TaskController, roots: &[TaskId]) -> Result<Vec<RootOutput>, ControlError> {
    let strategy = ctrl.settings().failure_strategy;
    roots
        .iter()
        .map(|root| {
            Ok(RootOutput {
                root: *root,
                frames: collect(ctrl.run_all(*root)?, strategy)?,
            })
        })
        .collect()
}
