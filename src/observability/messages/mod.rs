// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Messages are organized by subsystem:
//!
//! * `control` - task tree mutations and cache invalidation
//! * `runner` - pipeline construction and per-item iteration
//! * `pool` - pooled execution across workers

use tracing::Span;

pub mod control;
pub mod pool;
pub mod runner;

/// A message that knows how to emit itself as a structured event.
pub trait StructuredLog {
    /// Emit the message at its natural level, with structured fields.
    fn log(&self);

    /// Build a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
