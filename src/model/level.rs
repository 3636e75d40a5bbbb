// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;

/// Granularity a task's transform operates at.
///
/// Roots read whole tracks (`Project`) and hand out per-bead frames; downstream
/// tasks may work per bead, per cycle, per event or per peak. `None` is used by
/// tasks that do not care about the granularity of their input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Project,
    Bead,
    Cycle,
    Event,
    Peak,
    #[default]
    None,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Project => "project",
            Level::Bead => "bead",
            Level::Cycle => "cycle",
            Level::Event => "event",
            Level::Peak => "peak",
            Level::None => "none",
        };
        f.write_str(name)
    }
}
