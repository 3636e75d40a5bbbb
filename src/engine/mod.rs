// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod cache;
pub mod frame;
pub mod pool;
pub mod pooled_runner;
pub mod runner;

pub use cache::{CacheHandle, CacheSlot, CacheValue, KeyedStore};
pub use frame::{Action, DataSource, Frame, FrameOutput, FrameStream, MemorySource};
pub use pool::{default_nworkers, poolchunk, DummyPool, IsolatedPool, ThreadPool, WorkerPayload};
pub use pooled_runner::{run_serial, PooledRunner, RemoteJob, RootOutput, WORKER_MARK};
pub use runner::{Runner, Stage};
