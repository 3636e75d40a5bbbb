// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::backends::local::processors::task_config;
use crate::engine::Runner;
use crate::errors::ControlError;
use crate::model::{Key, Task};
use crate::traits::Processor;
use serde::Deserialize;

pub const SELECTION: &str = "selection";

#[derive(Debug, Clone, Default, Deserialize)]
struct SelectionConfig {
    /// Keep only these keys, when set
    selected: Option<Vec<Key>>,
    #[serde(default)]
    discarded: Vec<Key>,
}

/// Restricts frames to a subset of their keys.
pub struct DataSelectionProcessor;

impl Processor for DataSelectionProcessor {
    fn tasktype(&self) -> &'static str {
        SELECTION
    }

    fn run(&self, task: &Task, args: &mut Runner) -> Result<(), ControlError> {
        let cfg: SelectionConfig = task_config(task)?;
        args.apply(move |frame| {
            let frame = match &cfg.selected {
                Some(keys) => frame.selecting(keys.iter().copied()),
                None => frame,
            };
            frame.discarding(cfg.discarded.iter().copied())
        })
    }

    fn can_pool(&self, _task: &Task) -> bool {
        true
    }
}
