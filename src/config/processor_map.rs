// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::ControlError;
use crate::traits::Processor;
use std::collections::HashMap;
use std::sync::Arc;

/// A registry mapping task types to the processors implementing them.
///
/// Each task type has exactly one processor, shared by every task of that type in
/// every chain. Processors are wrapped in `Arc` so the controller, the runners
/// and pool workers can hold the same instance.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use the_tasktree::backends::local::processors::ScaleProcessor;
/// use the_tasktree::config::ProcessorMap;
///
/// let mut processors = ProcessorMap::new();
/// processors.register(Arc::new(ScaleProcessor));
///
/// assert!(processors.contains_key("scale"));
/// assert!(processors.resolve("scale").is_ok());
/// assert!(processors.resolve("warp_drive").is_err());
/// ```
#[derive(Clone, Default)]
pub struct ProcessorMap(pub HashMap<String, Arc<dyn Processor>>);

impl ProcessorMap {
    /// Create a new empty processor map
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Create a ProcessorMap from configuration, resolving every listed built-in.
    ///
    /// An empty list registers all of them.
    pub fn from_config(cfg: &crate::config::Config) -> Result<Self, String> {
        if cfg.processors.is_empty() {
            return Ok(crate::backends::local::LocalProcessorFactory::builtins());
        }

        let mut registry = Self::new();
        for name in &cfg.processors {
            let processor = crate::backends::local::LocalProcessorFactory::create_processor(name)
                .map_err(|e| format!("Failed to create local processor '{}': {}", name, e))?;
            registry.register(processor);
        }
        Ok(registry)
    }

    /// Register `processor` under its task type, replacing any previous one.
    pub fn register(&mut self, processor: Arc<dyn Processor>) {
        self.0.insert(processor.tasktype().to_string(), processor);
    }

    /// Get the processor for a task type
    pub fn get(&self, tasktype: &str) -> Option<&Arc<dyn Processor>> {
        self.0.get(tasktype)
    }

    pub fn resolve(&self, tasktype: &str) -> Result<Arc<dyn Processor>, ControlError> {
        self.get(tasktype)
            .cloned()
            .ok_or_else(|| ControlError::UnknownTaskType(tasktype.to_string()))
    }

    /// Check if a task type is registered
    pub fn contains_key(&self, tasktype: &str) -> bool {
        self.0.contains_key(tasktype)
    }

    /// Get all registered task types
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Get the number of processors in the map
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the processor map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for ProcessorMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tasktypes: Vec<&String> = self.0.keys().collect();
        tasktypes.sort();
        f.debug_struct("ProcessorMap")
            .field("processor_count", &self.0.len())
            .field("tasktypes", &tasktypes)
            .finish()
    }
}

impl From<Vec<Arc<dyn Processor>>> for ProcessorMap {
    fn from(processors: Vec<Arc<dyn Processor>>) -> Self {
        let mut map = Self::new();
        for processor in processors {
            map.register(processor);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_from_config_table_driven() {
        struct TestCase {
            name: &'static str,
            processors: Vec<&'static str>,
            expected_tasktypes: Vec<&'static str>,
        }

        let test_cases = vec![
            TestCase {
                name: "empty list registers every built-in",
                processors: vec![],
                expected_tasktypes: vec!["scale", "selection", "simulator", "summary"],
            },
            TestCase {
                name: "single processor",
                processors: vec!["scale"],
                expected_tasktypes: vec!["scale"],
            },
            TestCase {
                name: "several processors",
                processors: vec!["simulator", "selection"],
                expected_tasktypes: vec!["selection", "simulator"],
            },
        ];

        for test_case in test_cases {
            let config = Config {
                processors: test_case.processors.iter().map(|p| p.to_string()).collect(),
                ..Config::default()
            };
            let processor_map = ProcessorMap::from_config(&config).unwrap();

            let mut tasktypes: Vec<&str> = processor_map.keys().map(String::as_str).collect();
            tasktypes.sort();
            assert_eq!(
                tasktypes, test_case.expected_tasktypes,
                "Test case '{}'",
                test_case.name
            );
            for tasktype in tasktypes {
                assert_eq!(processor_map.get(tasktype).unwrap().tasktype(), tasktype);
            }
        }
    }

    #[test]
    fn test_from_config_unknown_processor() {
        let config = Config {
            processors: vec!["teleporter".to_string()],
            ..Config::default()
        };
        let err = ProcessorMap::from_config(&config).unwrap_err();
        assert!(err.contains("teleporter"));
    }

    #[test]
    fn test_resolve_unknown_tasktype() {
        let map = ProcessorMap::new();
        assert!(map.is_empty());
        assert!(matches!(
            map.resolve("scale"),
            Err(ControlError::UnknownTaskType(name)) if name == "scale"
        ));
    }
}
