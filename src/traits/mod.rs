// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod pool;
pub mod processor;

pub use crate::config::ProcessorMap;
pub use pool::{Isolation, Job, WorkerPool};
pub use processor::Processor;
