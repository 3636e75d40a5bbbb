// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lazy, keyed views over a data source.
//!
//! A [`Frame`] never holds computed items. It holds a source, the ordered list of
//! per-item actions stacked on it by processors and the key selection. Items are
//! computed when requested through [`Frame::get`] or iteration, and iterating a
//! frame twice starts over from the source each time.

use crate::errors::{ControlError, FailureStrategy, ProcessorError};
use crate::model::{Key, Record};
use crate::observability::messages::runner::ItemSkipped;
use crate::observability::messages::StructuredLog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Per-item transformation stacked onto a frame.
pub type Action = Arc<dyn Fn(Key, Record) -> Result<Record, ProcessorError> + Send + Sync>;

/// Lazy sequence of frames produced by a pipeline.
pub type FrameStream = Box<dyn Iterator<Item = Frame> + Send>;

/// Origin of the raw items of a frame.
pub trait DataSource: Send + Sync {
    /// Keys in source order
    fn keys(&self) -> Vec<Key>;

    fn get(&self, key: Key) -> Result<Record, ProcessorError>;
}

/// A source over already computed items.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    items: Vec<(Key, Record)>,
    index: HashMap<Key, usize>,
}

impl MemorySource {
    pub fn new(items: Vec<(Key, Record)>) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(position, (key, _))| (*key, position))
            .collect();
        Self { items, index }
    }
}

impl DataSource for MemorySource {
    fn keys(&self) -> Vec<Key> {
        self.items.iter().map(|(key, _)| *key).collect()
    }

    fn get(&self, key: Key) -> Result<Record, ProcessorError> {
        self.index
            .get(&key)
            .map(|&position| self.items[position].1.clone())
            .ok_or_else(|| ProcessorError::for_key(key, "memory", "key is not in this source"))
    }
}

#[derive(Clone)]
pub struct Frame {
    name: Arc<str>,
    source: Arc<dyn DataSource>,
    actions: Vec<Action>,
    selected: Option<Arc<BTreeSet<Key>>>,
    discarded: Arc<BTreeSet<Key>>,
}

impl Frame {
    pub fn new(name: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            source,
            actions: Vec::new(),
            selected: None,
            discarded: Arc::new(BTreeSet::new()),
        }
    }

    pub fn from_items(name: impl Into<String>, items: Vec<(Key, Record)>) -> Self {
        Self::new(name, Arc::new(MemorySource::new(items)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn accepts(&self, key: Key) -> bool {
        !self.discarded.contains(&key)
            && self
                .selected
                .as_ref()
                .map_or(true, |selected| selected.contains(&key))
    }

    /// Keys visible through this frame, in source order.
    pub fn keys(&self) -> Vec<Key> {
        self.source
            .keys()
            .into_iter()
            .filter(|key| self.accepts(*key))
            .collect()
    }

    /// Compute one item: read it from the source, then apply every action in order.
    pub fn get(&self, key: Key) -> Result<Record, ProcessorError> {
        if !self.accepts(key) {
            return Err(ProcessorError::for_key(
                key,
                self.name(),
                "key is not selected in this frame",
            ));
        }
        let record = self.source.get(key).map_err(|e| e.with_key(key))?;
        self.actions
            .iter()
            .try_fold(record, |record, action| action(key, record))
            .map_err(|e| e.with_key(key))
    }

    /// Every selected item, skipping (and logging) the ones that fail.
    pub fn iter(&self) -> FrameIter {
        FrameIter {
            inner: self.try_iter(),
        }
    }

    /// Every selected item along with its computation result.
    pub fn try_iter(&self) -> TryFrameIter {
        TryFrameIter {
            frame: self.clone(),
            keys: self.keys().into_iter(),
        }
    }

    /// Restrict the frame to `keys`, on top of any previous selection.
    pub fn selecting(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        let keys: BTreeSet<Key> = keys.into_iter().collect();
        let selected = match self.selected.take() {
            Some(previous) => previous.intersection(&keys).copied().collect(),
            None => keys,
        };
        self.selected = Some(Arc::new(selected));
        self
    }

    /// Hide `keys` from the frame.
    pub fn discarding(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        let mut discarded = (*self.discarded).clone();
        discarded.extend(keys);
        self.discarded = Arc::new(discarded);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Replace every stacked action with `action`.
    pub fn replace_actions(mut self, action: Action) -> Self {
        self.actions = vec![action];
        self
    }

    /// The stacked actions folded into a single one, `None` when there are none.
    pub fn composed(&self) -> Option<Action> {
        match self.actions.len() {
            0 => None,
            1 => Some(self.actions[0].clone()),
            _ => {
                let actions = self.actions.clone();
                Some(Arc::new(move |key, record| {
                    actions
                        .iter()
                        .try_fold(record, |record, action| action(key, record))
                }))
            }
        }
    }

    /// Compute every selected item now.
    pub fn materialize(&self, strategy: FailureStrategy) -> Result<FrameOutput, ControlError> {
        let mut items = Vec::new();
        for (key, result) in self.try_iter() {
            match result {
                Ok(record) => items.push((key, record)),
                Err(error) => match strategy {
                    FailureStrategy::FailFast => return Err(error.into()),
                    FailureStrategy::ContinueOnError => ItemSkipped {
                        frame: self.name(),
                        error: &error,
                    }
                    .log(),
                },
            }
        }
        Ok(FrameOutput {
            name: self.name().to_string(),
            items,
        })
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("name", &self.name)
            .field("actions", &self.actions.len())
            .field("selected", &self.selected)
            .field("discarded", &self.discarded)
            .finish()
    }
}

pub struct TryFrameIter {
    frame: Frame,
    keys: std::vec::IntoIter<Key>,
}

impl Iterator for TryFrameIter {
    type Item = (Key, Result<Record, ProcessorError>);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.keys.next()?;
        Some((key, self.frame.get(key)))
    }
}

pub struct FrameIter {
    inner: TryFrameIter,
}

impl Iterator for FrameIter {
    type Item = (Key, Record);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, result) = self.inner.next()?;
            match result {
                Ok(record) => return Some((key, record)),
                Err(error) => ItemSkipped {
                    frame: self.inner.frame.name(),
                    error: &error,
                }
                .log(),
            }
        }
    }
}

/// Computed items of one frame, in key order of the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameOutput {
    pub name: String,
    pub items: Vec<(Key, Record)>,
}

impl FrameOutput {
    /// A frame reading back these items.
    pub fn into_frame(self) -> Frame {
        Frame::from_items(self.name, self.items)
    }

    pub fn keys(&self) -> Vec<Key> {
        self.items.iter().map(|(key, _)| *key).collect()
    }

    pub fn values(&self) -> Vec<(Key, Vec<f64>)> {
        self.items
            .iter()
            .map(|(key, record)| (*key, record.values.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn frame() -> Frame {
        Frame::from_items(
            "track",
            (0..5).map(|key| (key, Record::new(vec![key as f64]))).collect(),
        )
    }

    fn doubling() -> Action {
        Arc::new(|_, mut record: Record| {
            record.values.iter_mut().for_each(|v| *v *= 2.0);
            Ok(record)
        })
    }

    #[test]
    fn test_actions_apply_in_order() {
        let add_one: Action = Arc::new(|_, mut record: Record| {
            record.values[0] += 1.0;
            Ok(record)
        });
        let frame = frame().with_action(doubling()).with_action(add_one);
        assert_eq!(frame.get(3).unwrap().values, vec![7.0]);
    }

    #[test]
    fn test_selection_and_discard() {
        let frame = frame().selecting([1, 2, 3]).discarding([2]).selecting([2, 3, 4]);
        assert_eq!(frame.keys(), vec![3]);
        assert!(frame.get(1).is_err());
    }

    #[test]
    fn test_iteration_is_lazy_and_restartable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let counting: Action = Arc::new(move |_, record| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(record)
        });
        let frame = frame().with_action(counting);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(frame.iter().count(), 5);
        assert_eq!(frame.iter().count(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_failing_items_are_skipped() {
        let failing: Action = Arc::new(|key, record| {
            if key == 2 {
                Err(ProcessorError::new("test", "bad bead"))
            } else {
                Ok(record)
            }
        });
        let frame = frame().with_action(failing);

        let keys: Vec<Key> = frame.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec![0, 1, 3, 4]);

        let err = frame.get(2).unwrap_err();
        assert_eq!(err.key, Some(2));

        let output = frame.materialize(FailureStrategy::ContinueOnError).unwrap();
        assert_eq!(output.keys(), vec![0, 1, 3, 4]);
        assert!(matches!(
            frame.materialize(FailureStrategy::FailFast),
            Err(ControlError::Processor(_))
        ));
    }

    #[test]
    fn test_composed_matches_stacked_actions() {
        let frame = frame().with_action(doubling()).with_action(doubling());
        let composed = frame.composed().unwrap();
        let direct = frame.get(4).unwrap();
        let folded = composed(4, Record::new(vec![4.0])).unwrap();
        assert_eq!(direct, folded);
        assert!(super::Frame::from_items("empty", vec![]).composed().is_none());
    }
}
