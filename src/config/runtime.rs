// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{Config, PoolMode, ProcessorMap};
use crate::control::{TaskController, TaskOrder};
use crate::engine::{IsolatedPool, ThreadPool};
use crate::errors::ControlError;
use crate::model::TaskId;
use crate::traits::WorkerPool;
use std::sync::Arc;

/// Everything needed to compute the configured tracks.
pub struct Runtime {
    pub controller: TaskController,
    /// `None` in serial mode
    pub pool: Option<Arc<dyn WorkerPool>>,
    /// Roots of the configured tracks, in configuration order
    pub roots: Vec<TaskId>,
}

/// Runtime builder - orchestrates processor registry, controller and pool creation
/// from configuration.
///
/// # Examples
///
/// ```
/// use the_tasktree::config::{Config, RuntimeBuilder};
///
/// let config: Config = serde_yaml::from_str(r#"
/// pool:
///   mode: threads
///   nworkers: 2
/// tracks:
///   - root: { tasktype: simulator, kind: root, params: { nbeads: 3 } }
///     tasks: [{ tasktype: scale, params: { factor: 2.0 } }]
/// "#).unwrap();
///
/// let runtime = RuntimeBuilder::from_config(&config).unwrap();
///
/// assert_eq!(runtime.roots.len(), 1);
/// assert_eq!(runtime.pool.unwrap().nworkers(), 2);
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build the runtime described by `cfg`, opening every configured track.
    pub fn from_config(cfg: &Config) -> Result<Runtime, ControlError> {
        let processors = ProcessorMap::from_config(cfg).map_err(|reason| {
            ControlError::InvalidTask {
                tasktype: cfg.processors.join(","),
                reason,
            }
        })?;

        let mut controller = TaskController::new(processors)
            .with_settings(cfg.engine)
            .with_task_order(TaskOrder::new(cfg.task_order.iter().cloned()));

        let roots = cfg
            .tracks
            .iter()
            .map(|track| {
                controller.open_track(
                    track.root.restore(),
                    track.tasks.iter().map(|task| task.restore()),
                )
            })
            .collect::<Result<Vec<_>, ControlError>>()?;

        let nworkers = cfg.pool.worker_count();
        let pool: Option<Arc<dyn WorkerPool>> = match cfg.pool.mode {
            PoolMode::Serial => None,
            PoolMode::Threads => Some(Arc::new(ThreadPool::new(nworkers))),
            PoolMode::Isolated => Some(Arc::new(IsolatedPool::new(nworkers))),
        };

        Ok(Runtime {
            controller,
            pool,
            roots,
        })
    }
}
