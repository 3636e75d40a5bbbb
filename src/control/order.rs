// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::model::Task;

/// Preferred order of task types, used to place tasks added without an index.
///
/// A task of type `T` goes right before the first task (after the root) whose
/// type does not come before `T` in the order. Types missing from the order go
/// at the end of the chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOrder {
    types: Vec<String>,
    side: usize,
}

impl TaskOrder {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            side: 0,
        }
    }

    /// With a side of 1, a task goes after existing tasks of its own type
    /// instead of before them.
    pub fn with_side(mut self, side: usize) -> Self {
        self.side = side.min(1);
        self
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Insertion index for a task of type `tasktype` into `chain`.
    pub fn index_for(&self, chain: &[Task], tasktype: &str) -> usize {
        let Some(position) = self.types.iter().position(|t| t == tasktype) else {
            return chain.len();
        };
        let previous = &self.types[..(position + self.side).min(self.types.len())];
        chain
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, task)| !previous.iter().any(|t| t == task.tasktype()))
            .map_or(chain.len(), |(index, _)| index)
    }
}
