// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::processors::*;
use crate::config::ProcessorMap;
use crate::traits::Processor;

/// Factory for creating local (in-process) processor instances
pub struct LocalProcessorFactory;

impl LocalProcessorFactory {
    /// Create a built-in processor by task type:
    /// - "simulator" -> SimulatorProcessor (root)
    /// - "selection" -> DataSelectionProcessor
    /// - "scale" -> ScaleProcessor
    /// - "summary" -> SummaryProcessor
    pub fn create_processor(name: &str) -> Result<Arc<dyn Processor>, String> {
        match name {
            SIMULATOR => Ok(Arc::new(SimulatorProcessor)),
            SELECTION => Ok(Arc::new(DataSelectionProcessor)),
            SCALE => Ok(Arc::new(ScaleProcessor)),
            SUMMARY => Ok(Arc::new(SummaryProcessor)),
            _ => Err(format!("Unknown local processor implementation: '{}'", name)),
        }
    }

    /// A registry holding every built-in processor.
    pub fn builtins() -> ProcessorMap {
        let mut map = ProcessorMap::new();
        map.register(Arc::new(SimulatorProcessor));
        map.register(Arc::new(DataSelectionProcessor));
        map.register(Arc::new(ScaleProcessor));
        map.register(Arc::new(SummaryProcessor));
        map
    }

    /// List all available local processor implementations
    pub fn list_available_implementations() -> Vec<&'static str> {
        vec![SIMULATOR, SELECTION, SCALE, SUMMARY]
    }

    /// Check if an implementation is available
    pub fn is_implementation_available(name: &str) -> bool {
        Self::list_available_implementations().contains(&name)
    }
}
