// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::Runner;
use crate::errors::{ControlError, ProcessorError};
use crate::model::Task;
use crate::traits::Processor;

pub const SUMMARY: &str = "summary";

/// Replaces the samples of every item with `[mean, min, max]`.
///
/// Always runs on the orchestrator.
pub struct SummaryProcessor;

impl Processor for SummaryProcessor {
    fn tasktype(&self) -> &'static str {
        SUMMARY
    }

    fn run(&self, _task: &Task, args: &mut Runner) -> Result<(), ControlError> {
        args.with_action(|key, mut record| {
            if record.is_empty() {
                return Err(ProcessorError::for_key(key, SUMMARY, "no samples to summarize"));
            }
            let count = record.len() as f64;
            let mean = record.values.iter().sum::<f64>() / count;
            let min = record.values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = record.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            record.values = vec![mean, min, max];
            record.push_trail(SUMMARY);
            Ok(record)
        })
    }
}
