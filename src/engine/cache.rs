// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-task cache slots.
//!
//! Every task of an open chain owns one [`CacheSlot`]. A slot holds at most one
//! type-erased value and a generation number. Clearing or overwriting the slot
//! bumps the generation; seeding an empty slot does not. A [`CacheHandle`]
//! remembers the generation it was taken at and stops returning anything once the
//! slot has moved past it, so a handle never observes data computed under an
//! older configuration of the task.

use crate::model::{Key, Record};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub type CacheValue = Arc<dyn Any + Send + Sync>;

fn next_generation() -> u64 {
    static GENERATION: AtomicU64 = AtomicU64::new(1);
    GENERATION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Default)]
struct SlotState {
    generation: u64,
    value: Option<CacheValue>,
}

#[derive(Clone, Default)]
pub struct CacheSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl CacheSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached value, seeding the slot with `make()` when it is empty.
    ///
    /// Returns `None` if the slot already holds a value of another type.
    pub fn set_default_with<T, F>(&self, make: F) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let mut state = self.lock();
        match &state.value {
            Some(value) => value.clone().downcast::<T>().ok(),
            None => {
                let value = Arc::new(make());
                state.value = Some(value.clone());
                Some(value)
            }
        }
    }

    /// Overwrite the slot. Handles taken before the call go stale.
    pub fn set_value(&self, value: CacheValue) -> CacheHandle {
        let mut state = self.lock();
        state.generation = next_generation();
        state.value = Some(value);
        CacheHandle {
            slot: self.clone(),
            generation: state.generation,
        }
    }

    pub fn set<T: Any + Send + Sync>(&self, value: T) -> CacheHandle {
        self.set_value(Arc::new(value))
    }

    /// Drop the cached value. Returns whether something was dropped.
    pub fn clear(&self) -> bool {
        let mut state = self.lock();
        state.generation = next_generation();
        state.value.take().is_some()
    }

    pub fn get(&self) -> Option<CacheValue> {
        self.lock().value.clone()
    }

    pub fn handle(&self) -> CacheHandle {
        CacheHandle {
            slot: self.clone(),
            generation: self.lock().generation,
        }
    }
}

impl fmt::Debug for CacheSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("CacheSlot")
            .field("generation", &state.generation)
            .field("populated", &state.value.is_some())
            .finish()
    }
}

/// Accessor to the contents of a slot as of the moment it was taken.
#[derive(Clone, Debug)]
pub struct CacheHandle {
    slot: CacheSlot,
    generation: u64,
}

impl CacheHandle {
    /// The current value, or `None` if the slot is empty or was invalidated since.
    pub fn get(&self) -> Option<CacheValue> {
        let state = self.slot.lock();
        if state.generation == self.generation {
            state.value.clone()
        } else {
            None
        }
    }

    pub fn get_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get()?.downcast::<T>().ok()
    }

    pub fn is_stale(&self) -> bool {
        self.slot.lock().generation != self.generation
    }
}

/// Computed records of one task, grouped by frame name.
#[derive(Debug, Default)]
pub struct KeyedStore {
    frames: Mutex<BTreeMap<String, BTreeMap<Key, Record>>>,
}

impl KeyedStore {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, BTreeMap<Key, Record>>> {
        self.frames.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, frame: &str, key: Key) -> Option<Record> {
        self.lock().get(frame)?.get(&key).cloned()
    }

    pub fn insert(&self, frame: &str, key: Key, record: Record) {
        self.lock()
            .entry(frame.to_string())
            .or_default()
            .insert(key, record);
    }

    pub fn extend(&self, frame: &str, items: impl IntoIterator<Item = (Key, Record)>) {
        self.lock().entry(frame.to_string()).or_default().extend(items);
    }

    pub fn frames(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Items cached for `frame`, in key order.
    pub fn items(&self, frame: &str) -> Vec<(Key, Record)> {
        self.lock()
            .get(frame)
            .map(|items| items.iter().map(|(k, r)| (*k, r.clone())).collect())
            .unwrap_or_default()
    }

    pub fn frame_len(&self, frame: &str) -> usize {
        self.lock().get(frame).map_or(0, BTreeMap::len)
    }

    /// Total item count over all frames.
    pub fn len(&self) -> usize {
        self.lock().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
