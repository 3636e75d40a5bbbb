// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Every check runs and every failure is reported, so a broken configuration is
//! fixed in one pass rather than one error at a time:
//!
//! 1. **Processors**: every listed built-in exists and is listed once
//! 2. **Pool**: an explicit worker count is at least 1
//! 3. **Task order**: no type is listed twice
//! 4. **Tracks**: roots are root tasks, steps are not, and every task type is
//!    provided by a registered processor

use crate::backends::local::LocalProcessorFactory;
use crate::config::Config;
use crate::model::{TaskKind, TaskSnapshot};
use std::collections::HashSet;

/// Check `cfg`, returning one message per problem found.
pub fn validate_config(cfg: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let available = LocalProcessorFactory::list_available_implementations();
    let mut listed = HashSet::new();
    for name in &cfg.processors {
        if !available.contains(&name.as_str()) {
            errors.push(format!(
                "Unknown processor '{}'. Available: {}",
                name,
                available.join(", ")
            ));
        }
        if !listed.insert(name.as_str()) {
            errors.push(format!("Processor '{}' is listed more than once", name));
        }
    }
    let registered: HashSet<&str> = if cfg.processors.is_empty() {
        available.iter().copied().collect()
    } else {
        listed
    };

    if cfg.pool.nworkers == Some(0) {
        errors.push("pool.nworkers must be at least 1".to_string());
    }

    let mut ordered = HashSet::new();
    for tasktype in &cfg.task_order {
        if !ordered.insert(tasktype.as_str()) {
            errors.push(format!("task_order lists '{}' more than once", tasktype));
        }
    }

    for (index, track) in cfg.tracks.iter().enumerate() {
        if track.root.kind != TaskKind::Root {
            errors.push(format!(
                "Track {}: '{}' must be declared with kind 'root'",
                index, track.root.tasktype
            ));
        }
        for task in &track.tasks {
            if task.kind == TaskKind::Root {
                errors.push(format!(
                    "Track {}: root task '{}' can only start a chain",
                    index, task.tasktype
                ));
            }
        }
        for task in std::iter::once(&track.root).chain(&track.tasks) {
            check_registered(index, task, &registered, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_registered(
    track: usize,
    task: &TaskSnapshot,
    registered: &HashSet<&str>,
    errors: &mut Vec<String>,
) {
    if !registered.contains(task.tasktype.as_str()) {
        errors.push(format!(
            "Track {}: no registered processor handles task type '{}'",
            track, task.tasktype
        ));
    }
}
