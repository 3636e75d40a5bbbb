// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic output of the engine goes through message types defined in
//! [`messages`]. Each message is a small struct implementing `Display` (human
//! readable text) and [`messages::StructuredLog`] (structured fields and spans),
//! which keeps log wording in one place instead of scattering format strings
//! through the engine.
//!
//! # Usage
//!
//! ```rust
//! use the_tasktree::model::TaskId;
//! use the_tasktree::observability::messages::{control::TrackOpened, StructuredLog};
//!
//! let msg = TrackOpened {
//!     root: TaskId::next(),
//!     task_count: 3,
//! };
//!
//! msg.log();
//! ```

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG` (defaults to `info`).
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
