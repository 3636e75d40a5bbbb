// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::backends::local::processors::task_config;
use crate::engine::{DataSource, Frame, Runner};
use crate::errors::{ControlError, ProcessorError};
use crate::model::{Key, Record, Task};
use crate::traits::Processor;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

pub const SIMULATOR: &str = "simulator";

fn default_nbeads() -> u32 {
    4
}

fn default_nsamples() -> usize {
    16
}

#[derive(Debug, Clone, Deserialize)]
struct SimulatorConfig {
    #[serde(default = "default_nbeads")]
    nbeads: u32,
    #[serde(default = "default_nsamples")]
    nsamples: usize,
    #[serde(default)]
    seed: u64,
    name: Option<String>,
    /// Beads whose reading fails
    #[serde(default)]
    corrupted: Vec<Key>,
}

/// Deterministic synthetic track: `nbeads` beads of `nsamples` samples each.
#[derive(Debug, Clone)]
pub struct SimulatedTrack {
    nbeads: u32,
    nsamples: usize,
    seed: u64,
    corrupted: BTreeSet<Key>,
}

impl SimulatedTrack {
    pub fn new(nbeads: u32, nsamples: usize, seed: u64) -> Self {
        Self {
            nbeads,
            nsamples,
            seed,
            corrupted: BTreeSet::new(),
        }
    }

    pub fn with_corrupted(mut self, beads: impl IntoIterator<Item = Key>) -> Self {
        self.corrupted.extend(beads);
        self
    }

    pub fn nbeads(&self) -> u32 {
        self.nbeads
    }

    /// Sample `index` of `bead`, in [0, 10).
    fn sample(&self, bead: Key, index: usize) -> f64 {
        let mut x = self.seed
            ^ u64::from(bead).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (index as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        x ^= x >> 31;
        x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
        x ^= x >> 29;
        (x % 10_000) as f64 / 1_000.0
    }
}

impl DataSource for SimulatedTrack {
    fn keys(&self) -> Vec<Key> {
        (0..self.nbeads).collect()
    }

    fn get(&self, key: Key) -> Result<Record, ProcessorError> {
        if key >= self.nbeads {
            return Err(ProcessorError::for_key(key, SIMULATOR, "no such bead"));
        }
        if self.corrupted.contains(&key) {
            return Err(ProcessorError::for_key(key, SIMULATOR, "corrupted bead"));
        }
        let mut record = Record::new((0..self.nsamples).map(|i| self.sample(key, i)).collect());
        record.push_trail(SIMULATOR);
        Ok(record)
    }
}

/// Root processor producing one [`SimulatedTrack`] frame.
///
/// The track is kept in the root's cache, so it is built once per configuration.
pub struct SimulatorProcessor;

impl Processor for SimulatorProcessor {
    fn tasktype(&self) -> &'static str {
        SIMULATOR
    }

    fn run(&self, task: &Task, args: &mut Runner) -> Result<(), ControlError> {
        let cfg: SimulatorConfig = task_config(task)?;
        let name = cfg
            .name
            .clone()
            .unwrap_or_else(|| format!("track-{}", cfg.seed));
        let track = args.set_cache_default(|| {
            SimulatedTrack::new(cfg.nbeads, cfg.nsamples, cfg.seed).with_corrupted(cfg.corrupted)
        })?;
        let source: Arc<dyn DataSource> = track;
        args.set_source(std::iter::once(Frame::new(name, source)));
        Ok(())
    }

    fn can_pool(&self, _task: &Task) -> bool {
        true
    }

    fn is_slow(&self, _task: &Task) -> bool {
        true
    }
}
