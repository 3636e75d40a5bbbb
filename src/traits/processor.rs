// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::Runner;
use crate::errors::ControlError;
use crate::model::Task;

/// Stateless implementation of one task type.
///
/// A processor is registered once per task type and shared by every task of that
/// type in every chain. It receives the task it runs for and a [`Runner`] through
/// which it stacks lazy work on the pipeline built so far. Any state that
/// outlives a run belongs in the task's cache slot, never in the processor.
///
/// Closures handed to the runner must be `'static`, so they cannot borrow the
/// task or the processor. Owned captures still compile: a cloned `Task` or an
/// `Arc` of a processor can be moved in. A task clone is detached from its chain,
/// so it carries no upstream tasks or caches, but prefer extracting the values
/// the closure needs first:
///
/// ```compile_fail
/// use the_tasktree::engine::Runner;
/// use the_tasktree::errors::ControlError;
/// use the_tasktree::model::Task;
/// use the_tasktree::traits::Processor;
///
/// struct Leaky;
///
/// impl Processor for Leaky {
///     fn tasktype(&self) -> &'static str {
///         "leaky"
///     }
///
///     fn run(&self, task: &Task, args: &mut Runner) -> Result<(), ControlError> {
///         args.with_action(move |_, record| {
///             let _ = task.params();
///             Ok(record)
///         })
///     }
/// }
/// ```
///
/// The accepted form reads the configuration up front:
///
/// ```
/// use the_tasktree::engine::Runner;
/// use the_tasktree::errors::ControlError;
/// use the_tasktree::model::Task;
/// use the_tasktree::traits::Processor;
///
/// struct Offset;
///
/// impl Processor for Offset {
///     fn tasktype(&self) -> &'static str {
///         "offset"
///     }
///
///     fn run(&self, task: &Task, args: &mut Runner) -> Result<(), ControlError> {
///         let offset = task.param("offset").and_then(|v| v.as_f64()).unwrap_or(0.0);
///         args.with_action(move |_, mut record| {
///             record.values.iter_mut().for_each(|v| *v += offset);
///             Ok(record)
///         })
///     }
/// }
/// ```
pub trait Processor: Send + Sync {
    /// Task type this processor implements
    fn tasktype(&self) -> &'static str;

    /// Extend the pipeline held by `args` with the work of `task`.
    fn run(&self, task: &Task, args: &mut Runner) -> Result<(), ControlError>;

    /// Whether `task` may be computed by a pool worker.
    fn can_pool(&self, _task: &Task) -> bool {
        false
    }

    /// Whether computing `task` is expensive enough to favor a pool.
    ///
    /// A pooled run whose chains contain no slow enabled stage runs serially.
    fn is_slow(&self, _task: &Task) -> bool {
        false
    }
}
