// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Task descriptors.
//!
//! A [`Task`] is the configuration of one pipeline step. Tasks are compared and
//! hashed by their [`TaskId`], never by value: two tasks carrying the same
//! parameters still occupy different pipeline positions and must not share a
//! cache entry. Cloning a task keeps its id (the clone refers to the same
//! position); [`Task::duplicate`] and [`TaskSnapshot::restore`] allocate a new one.

use crate::model::Level;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Transform-specific fields of a task.
pub type Params = BTreeMap<String, serde_json::Value>;

/// Field name reserved for toggling [`Task::is_disabled`] through updates.
pub const DISABLED_FIELD: &str = "disabled";

/// Identity handle of a task, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Whether a task anchors a chain or is a step within one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Root,
    #[default]
    Step,
}

/// Configuration of one pipeline step.
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    tasktype: String,
    kind: TaskKind,
    level: Level,
    disabled: bool,
    params: Params,
}

impl Task {
    /// Create a step task of type `tasktype`.
    pub fn new(tasktype: impl Into<String>, level: Level) -> Self {
        Self {
            id: TaskId::next(),
            tasktype: tasktype.into(),
            kind: TaskKind::Step,
            level,
            disabled: false,
            params: Params::new(),
        }
    }

    /// Create a root task: the external data source anchoring a chain.
    pub fn root(tasktype: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Root,
            ..Self::new(tasktype, Level::Project)
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn tasktype(&self) -> &str {
        &self.tasktype
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn is_root(&self) -> bool {
        self.kind == TaskKind::Root
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&serde_json::Value> {
        self.params.get(name)
    }

    /// Deserialize the parameters into an owned, processor-specific configuration.
    ///
    /// The returned value is a frozen copy: closures built from it are not
    /// affected by later updates of the task.
    pub fn config<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .params
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(object))
    }

    /// A structurally equal task occupying a new pipeline position.
    pub fn duplicate(&self) -> Self {
        Self {
            id: TaskId::next(),
            ..self.clone()
        }
    }

    /// Apply field updates in place, returning the previous values of every
    /// touched field (`null` for fields that did not exist).
    ///
    /// A `null` value removes the field, so feeding the returned map back into
    /// `update` restores the task exactly.
    pub fn update(&mut self, fields: &Params) -> Params {
        let mut old = Params::new();
        for (name, value) in fields {
            if name == DISABLED_FIELD {
                old.insert(name.clone(), serde_json::Value::Bool(self.disabled));
                self.disabled = value.as_bool().unwrap_or(false);
                continue;
            }
            let previous = if value.is_null() {
                self.params.remove(name)
            } else {
                self.params.insert(name.clone(), value.clone())
            };
            old.insert(name.clone(), previous.unwrap_or(serde_json::Value::Null));
        }
        old
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            tasktype: self.tasktype.clone(),
            kind: self.kind,
            level: self.level,
            disabled: self.disabled,
            params: self.params.clone(),
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tasktype, self.id)
    }
}

/// Serializable form of a task, without its identity.
///
/// This is what the persistence collaborator stores and what isolated workers
/// receive. Restoring always yields a task with a fresh id, so a loaded task can
/// never alias one that is already in a live chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub tasktype: String,
    #[serde(default)]
    pub kind: TaskKind,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub params: Params,
}

impl TaskSnapshot {
    pub fn restore(&self) -> Task {
        Task {
            id: TaskId::next(),
            tasktype: self.tasktype.clone(),
            kind: self.kind,
            level: self.level,
            disabled: self.disabled,
            params: self.params.clone(),
        }
    }
}

/// Anything that designates a task by identity.
pub trait AsTaskId {
    fn task_id(&self) -> TaskId;
}

impl AsTaskId for TaskId {
    fn task_id(&self) -> TaskId {
        *self
    }
}

impl AsTaskId for Task {
    fn task_id(&self) -> TaskId {
        self.id
    }
}

impl<T: AsTaskId + ?Sized> AsTaskId for &T {
    fn task_id(&self) -> TaskId {
        (**self).task_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct ScaleConfig {
        factor: f64,
        #[serde(default)]
        offset: f64,
    }

    #[test]
    fn test_identity_not_value_equality() {
        let a = Task::new("scale", Level::Bead).with_param("factor", 2.0);
        let b = Task::new("scale", Level::Bead).with_param("factor", 2.0);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_ne!(a, a.duplicate());
        assert_eq!(a.params(), a.duplicate().params());
    }

    #[test]
    fn test_config_is_a_frozen_copy() {
        let mut task = Task::new("scale", Level::Bead).with_param("factor", 2.0);
        let frozen: ScaleConfig = task.config().unwrap();

        let mut fields = Params::new();
        fields.insert("factor".into(), 3.0.into());
        task.update(&fields);

        assert_eq!(frozen, ScaleConfig { factor: 2.0, offset: 0.0 });
        assert_eq!(task.config::<ScaleConfig>().unwrap().factor, 3.0);
    }

    #[test]
    fn test_update_returns_previous_values() {
        let mut task = Task::new("scale", Level::Bead).with_param("factor", 2.0);
        let mut fields = Params::new();
        fields.insert("factor".into(), 5.0.into());
        fields.insert("offset".into(), 1.0.into());
        fields.insert(DISABLED_FIELD.into(), true.into());

        let old = task.update(&fields);
        assert_eq!(old["factor"], serde_json::json!(2.0));
        assert_eq!(old["offset"], serde_json::Value::Null);
        assert_eq!(old[DISABLED_FIELD], serde_json::json!(false));
        assert!(task.is_disabled());

        task.update(&old);
        assert_eq!(task.param("factor"), Some(&serde_json::json!(2.0)));
        assert!(task.param("offset").is_none());
        assert!(!task.is_disabled());
    }

    #[test]
    fn test_restored_snapshot_gets_fresh_identity() {
        let root = Task::root("simulator").with_param("nbeads", 3);
        let snapshot = root.snapshot();
        let restored = snapshot.restore();

        assert!(restored.is_root());
        assert_ne!(restored.id(), root.id());
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn test_snapshot_yaml_defaults() {
        let yaml = r#"
tasktype: selection
params:
  discarded: [1, 2]
"#;
        let snapshot: TaskSnapshot = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(snapshot.kind, TaskKind::Step);
        assert_eq!(snapshot.level, Level::None);
        assert!(!snapshot.disabled);
        assert_eq!(snapshot.params["discarded"], serde_json::json!([1, 2]));
    }
}
