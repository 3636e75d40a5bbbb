// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::backends::local::processors::task_config;
use crate::engine::Runner;
use crate::errors::{ControlError, ProcessorError};
use crate::model::Task;
use crate::traits::Processor;
use serde::Deserialize;

pub const SCALE: &str = "scale";

fn default_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ScaleConfig {
    #[serde(default = "default_factor")]
    factor: f64,
    #[serde(default)]
    offset: f64,
}

/// `value * factor + offset` on every sample, cached per key.
pub struct ScaleProcessor;

impl Processor for ScaleProcessor {
    fn tasktype(&self) -> &'static str {
        SCALE
    }

    fn run(&self, task: &Task, args: &mut Runner) -> Result<(), ControlError> {
        let ScaleConfig { factor, offset } = task_config(task)?;
        args.cached_action(move |key, mut record| {
            if record.values.iter().any(|v| !v.is_finite()) {
                return Err(ProcessorError::for_key(key, SCALE, "non-finite sample"));
            }
            record
                .values
                .iter_mut()
                .for_each(|v| *v = *v * factor + offset);
            record.push_trail(SCALE);
            Ok(record)
        })?;
        Ok(())
    }

    fn can_pool(&self, _task: &Task) -> bool {
        true
    }
}
