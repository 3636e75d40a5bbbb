// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default limit, in bytes, on the inline state of a processor closure
pub const DEFAULT_MAX_CLOSURE_BYTES: usize = 1024;
/// Worker count used when the available parallelism cannot be queried
pub const DEFAULT_NWORKERS: usize = 4;
