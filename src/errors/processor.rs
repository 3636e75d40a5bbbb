// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-item processing failures.

use crate::model::Key;
use std::error::Error;
use std::fmt;

/// Failure raised while computing one keyed item of a frame.
///
/// These are recoverable: frame iteration skips the failing key and carries on
/// with the remaining ones, both serially and in pooled runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorError {
    /// Key being computed when the failure occurred, when known
    pub key: Option<Key>,
    /// Task type of the processor that failed
    pub tasktype: String,
    pub message: String,
}

impl ProcessorError {
    pub fn new(tasktype: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: None,
            tasktype: tasktype.into(),
            message: message.into(),
        }
    }

    pub fn for_key(key: Key, tasktype: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: Some(key),
            ..Self::new(tasktype, message)
        }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key.get_or_insert(key);
        self
    }
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key {
            Some(key) => write!(
                f,
                "Processor '{}' failed on key {}: {}",
                self.tasktype, key, self.message
            ),
            None => write!(f, "Processor '{}' failed: {}", self.tasktype, self.message),
        }
    }
}

impl Error for ProcessorError {}
