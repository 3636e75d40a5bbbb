// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Task tree control: chain mutations, cache invalidation and change events.

pub mod controller;
pub mod events;
pub mod order;
pub mod undo;

pub use controller::{InsertAt, TaskController};
pub use events::{EventKind, Observer, TaskEvent};
pub use order::TaskOrder;
pub use undo::{Mutation, UndoStack};
