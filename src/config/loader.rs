// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::DEFAULT_MAX_CLOSURE_BYTES;
use crate::errors::{ConfigError, FailureStrategy};
use crate::model::TaskSnapshot;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure for a task tree session.
///
/// # Fields
/// * `engine` - Limits and failure handling of the runners (optional)
/// * `pool` - Which worker pool runs the chains, if any (optional)
/// * `task_order` - Preferred order of task types, for automatic insertion (optional)
/// * `processors` - Built-in processors to register; all of them when empty
/// * `tracks` - Chains to open at startup
///
/// # Example
/// ```yaml
/// engine:
///   max_closure_bytes: 1024
///   failure_strategy: continue_on_error
/// pool:
///   mode: threads
///   nworkers: 4
/// task_order: [selection, scale, summary]
/// tracks:
///   - root:
///       tasktype: simulator
///       kind: root
///       params: { nbeads: 8, seed: 1 }
///     tasks:
///       - tasktype: scale
///         params: { factor: 2.0 }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub pool: PoolOptions,
    #[serde(default)]
    pub task_order: Vec<String>,
    #[serde(default)]
    pub processors: Vec<String>,
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

/// Settings shared by every runner of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EngineSettings {
    /// Largest inline state, in bytes, a processor closure may carry
    #[serde(default = "default_max_closure_bytes")]
    pub max_closure_bytes: usize,
    #[serde(default)]
    pub failure_strategy: FailureStrategy,
}

fn default_max_closure_bytes() -> usize {
    DEFAULT_MAX_CLOSURE_BYTES
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_closure_bytes: DEFAULT_MAX_CLOSURE_BYTES,
            failure_strategy: FailureStrategy::default(),
        }
    }
}

/// How chains are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    /// On the calling thread, one chain after the other
    #[default]
    Serial,
    /// On worker threads sharing the task tree's caches
    Threads,
    /// On worker threads fed with serialized snapshots only
    Isolated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PoolOptions {
    #[serde(default)]
    pub mode: PoolMode,
    pub nworkers: Option<usize>,
}

impl PoolOptions {
    /// Configured worker count, or the machine's available parallelism.
    pub fn worker_count(&self) -> usize {
        self.nworkers
            .unwrap_or_else(crate::engine::default_nworkers)
    }
}

/// A chain opened at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackConfig {
    pub root: TaskSnapshot,
    #[serde(default)]
    pub tasks: Vec<TaskSnapshot>,
}

/// Load a config from a YAML or TOML file, chosen by extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let cfg = if is_toml {
        toml::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(cfg)
}

/// Load a config and check it can be turned into a runtime.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Validation)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskKind;
    use std::io::Write;
    use tempfile::Builder;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
pool:
  mode: isolated
  nworkers: 3
task_order: [selection, scale]
tracks:
  - root:
      tasktype: simulator
      kind: root
      params: { nbeads: 4 }
    tasks:
      - tasktype: scale
        params: { factor: 2.0 }
"#;

        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.pool.mode, PoolMode::Isolated);
        assert_eq!(cfg.pool.worker_count(), 3);
        assert_eq!(cfg.engine, EngineSettings::default());
        assert_eq!(cfg.tracks.len(), 1);
        assert_eq!(cfg.tracks[0].root.kind, TaskKind::Root);
        assert_eq!(cfg.tracks[0].tasks[0].params["factor"], serde_json::json!(2.0));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.pool.mode, PoolMode::Serial);
        assert_eq!(cfg.engine.max_closure_bytes, DEFAULT_MAX_CLOSURE_BYTES);
        assert_eq!(cfg.engine.failure_strategy, FailureStrategy::ContinueOnError);
        assert!(cfg.pool.worker_count() >= 1);
    }

    #[test]
    fn test_load_yaml_and_toml_by_extension() {
        let yaml = write_config(
            ".yaml",
            r#"
engine:
  failure_strategy: fail_fast
pool:
  mode: threads
"#,
        );
        let cfg = load_config(yaml.path()).unwrap();
        assert_eq!(cfg.engine.failure_strategy, FailureStrategy::FailFast);
        assert_eq!(cfg.pool.mode, PoolMode::Threads);

        let toml = write_config(
            ".toml",
            r#"
task_order = ["selection", "scale"]

[engine]
max_closure_bytes = 64

[[tracks]]
root = { tasktype = "simulator", kind = "root", params = { nbeads = 2 } }
"#,
        );
        let cfg = load_config(toml.path()).unwrap();
        assert_eq!(cfg.engine.max_closure_bytes, 64);
        assert_eq!(cfg.task_order, vec!["selection", "scale"]);
        assert_eq!(cfg.tracks[0].root.params["nbeads"], serde_json::json!(2));
    }

    #[test]
    fn test_load_reports_parse_and_io_errors() {
        let broken = write_config(".yaml", "pool: [not, a, map]");
        assert!(matches!(load_config(broken.path()), Err(ConfigError::Yaml(_))));

        let broken = write_config(".toml", "engine = 3 = 4");
        assert!(matches!(load_config(broken.path()), Err(ConfigError::Toml(_))));

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_load_and_validate_rejects_unknown_task_types() {
        let file = write_config(
            ".yaml",
            r#"
tracks:
  - root: { tasktype: simulator, kind: root }
    tasks:
      - tasktype: warp_drive
"#,
        );
        let err = load_and_validate_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("warp_drive"));
    }
}
