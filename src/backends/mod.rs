// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Processor implementations.
//!
//! # Local Backend
//! In-process processors over synthetic bead tracks:
//! - **Root**: `simulator`, a deterministic track of beads and samples
//! - **Steps**: `selection`, `scale` (cached per bead) and `summary`
//!
//! # Stub Backend (Test-Only)
//! Counting and failing processors used to check caching, invalidation and
//! pooling. Not available in production builds.
//!
//! # Examples
//!
//! ```rust
//! use the_tasktree::backends::local::LocalProcessorFactory;
//!
//! let processor = LocalProcessorFactory::create_processor("scale")?;
//! assert_eq!(processor.tasktype(), "scale");
//! # Ok::<(), String>(())
//! ```

pub mod local;
#[cfg(test)]
pub mod stub;
