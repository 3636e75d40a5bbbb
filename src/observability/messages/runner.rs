// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline construction and frame iteration.

use crate::errors::ProcessorError;
use crate::model::Level;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A runner composed its processors into a lazy pipeline.
///
/// # Log Level
/// `debug!` - Emitted on every run request
pub struct PipelineBuilt<'a> {
    pub target: &'a str,
    pub stage_count: usize,
    pub skipped: usize,
    pub level: Level,
}

impl Display for PipelineBuilt<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Built pipeline up to '{}': {} stages ({} disabled), {} level output",
            self.target, self.stage_count, self.skipped, self.level
        )
    }
}

impl StructuredLog for PipelineBuilt<'_> {
    fn log(&self) {
        tracing::debug!(
            target_task = self.target,
            stage_count = self.stage_count,
            skipped = self.skipped,
            level = %self.level,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "pipeline_built",
            span_name = name,
            target_task = self.target,
            stage_count = self.stage_count,
        )
    }
}

/// A keyed item failed and was left out of a frame's output.
///
/// # Log Level
/// `warn!` - The run goes on, but the output is incomplete
///
/// # Example
/// ```
/// use the_tasktree::errors::ProcessorError;
/// use the_tasktree::observability::messages::runner::ItemSkipped;
///
/// let error = ProcessorError::for_key(3, "scale", "empty bead");
/// let msg = ItemSkipped {
///     frame: "track-1",
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct ItemSkipped<'a> {
    pub frame: &'a str,
    pub error: &'a ProcessorError,
}

impl Display for ItemSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Skipping item in frame '{}': {}", self.frame, self.error)
    }
}

impl StructuredLog for ItemSkipped<'_> {
    fn log(&self) {
        tracing::warn!(
            frame = self.frame,
            key = ?self.error.key,
            tasktype = %self.error.tasktype,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "item_skipped",
            span_name = name,
            frame = self.frame,
            key = ?self.error.key,
        )
    }
}

/// A closure was refused at pipeline construction.
///
/// # Log Level
/// `error!` - Programming error in a processor
pub struct ClosureRejected<'a> {
    pub processor: &'a str,
    pub size: usize,
    pub limit: usize,
}

impl Display for ClosureRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected closure of processor '{}': {} bytes captured, limit is {}",
            self.processor, self.size, self.limit
        )
    }
}

impl StructuredLog for ClosureRejected<'_> {
    fn log(&self) {
        tracing::error!(
            processor = self.processor,
            size = self.size,
            limit = self.limit,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "closure_rejected",
            span_name = name,
            processor = self.processor,
        )
    }
}
