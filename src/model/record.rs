// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Item key within a frame (a bead id for bead-level frames).
pub type Key = u32;

/// One keyed item of a frame.
///
/// `values` is the primary data transforms operate on. `metadata` is an
/// auxiliary side channel (which worker touched the item, which steps ran) and
/// never takes part in the computation of `values`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub values: Vec<f64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Record {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry, replacing any previous value under `name`.
    pub fn mark(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(name.into(), value.into());
    }

    pub fn with_mark(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.mark(name, value);
        self
    }

    /// Append `step` to the comma separated `trail` metadata entry.
    pub fn push_trail(&mut self, step: &str) {
        let trail = self.metadata.entry("trail".to_string()).or_default();
        if !trail.is_empty() {
            trail.push(',');
        }
        trail.push_str(step);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
