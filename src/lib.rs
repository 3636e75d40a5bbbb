// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // processor backends
pub mod config;     // config + registry + runtime
pub mod control;    // task tree, events, undo
pub mod engine;     // runners, caches, pools
pub mod errors;     // error handling
pub mod model;      // tasks, levels, records
pub mod observability;
pub mod traits;     // unified abstractions
