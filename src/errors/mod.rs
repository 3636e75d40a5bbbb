// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod control;
mod processor;

pub use config::ConfigError;
pub use control::{ControlError, FailureStrategy};
pub use processor::ProcessorError;
