// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration records flowing through the engine.
//!
//! * `task` - task descriptors, their identity handles and snapshots
//! * `level` - granularity a transform operates at
//! * `record` - keyed items produced by a chain

pub mod level;
pub mod record;
pub mod task;

pub use level::Level;
pub use record::{Key, Record};
pub use task::{AsTaskId, Params, Task, TaskId, TaskKind, TaskSnapshot};
