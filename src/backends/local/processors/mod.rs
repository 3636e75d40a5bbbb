// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod scale;
pub mod selection;
pub mod simulator;
pub mod summary;

pub use scale::*;
pub use selection::*;
pub use simulator::*;
pub use summary::*;

use crate::errors::ControlError;
use crate::model::Task;
use serde::de::DeserializeOwned;

/// Read the parameters of `task` into a processor configuration.
pub(crate) fn task_config<T: DeserializeOwned>(task: &Task) -> Result<T, ControlError> {
    task.config().map_err(|e| ControlError::InvalidTask {
        tasktype: task.tasktype().to_string(),
        reason: e.to_string(),
    })
}
