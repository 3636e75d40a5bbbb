// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use crate::config::{load_and_validate_config, PoolMode, RuntimeBuilder};
    use crate::engine::{run_serial, PooledRunner, WORKER_MARK};
    use crate::errors::{ConfigError, FailureStrategy};
    use crate::model::TaskKind;
    use crate::traits::Isolation;
    use std::io::Write;

    /// Test that the single track configuration loads and builds a serial runtime
    #[test]
    fn test_simple_track_yaml_loading() {
        let config = load_and_validate_config("configs/simple-track.yaml").unwrap();

        assert_eq!(config.pool.mode, PoolMode::Serial);
        assert_eq!(config.engine.failure_strategy, FailureStrategy::ContinueOnError);
        assert_eq!(config.task_order, vec!["selection", "scale", "summary"]);
        assert_eq!(config.tracks.len(), 1);
        assert_eq!(config.tracks[0].root.kind, TaskKind::Root);
        assert_eq!(config.tracks[0].tasks.len(), 3);

        let runtime = RuntimeBuilder::from_config(&config).unwrap();
        assert!(runtime.pool.is_none());
        assert_eq!(runtime.roots.len(), 1);
        let types: Vec<&str> = runtime
            .controller
            .tasklist(runtime.roots[0])
            .unwrap()
            .iter()
            .map(|task| task.tasktype())
            .collect();
        assert_eq!(types, vec!["simulator", "selection", "scale", "summary"]);
    }

    /// Test that corrupted beads are skipped and discarded beads are dropped
    #[test]
    fn test_simple_track_serial_run() {
        let config = load_and_validate_config("configs/simple-track.yaml").unwrap();
        let runtime = RuntimeBuilder::from_config(&config).unwrap();

        let outputs = run_serial(&runtime.controller, &runtime.roots).unwrap();
        assert_eq!(outputs.len(), 1);
        let frame = &outputs[0].frames[0];
        assert_eq!(frame.name, "track-1");
        assert_eq!(frame.keys(), vec![0, 1, 3, 4]);
        for (_, record) in &frame.items {
            let [mean, min, max] = record.values[..] else {
                panic!("summary should yield three values, got {:?}", record.values);
            };
            assert!(min <= mean && mean <= max);
            // Samples lie in [0, 10), scaled by 2 and shifted by 1.
            assert!((1.0..21.0).contains(&min));
            assert_eq!(record.metadata["trail"], "simulator,scale,summary");
        }
    }

    /// Test that a threaded runtime yields the same values as a serial run
    #[tokio::test]
    async fn test_threaded_tracks_match_serial_run() {
        let config = load_and_validate_config("configs/threaded-tracks.yaml").unwrap();
        assert_eq!(config.pool.mode, PoolMode::Threads);
        assert_eq!(config.pool.worker_count(), 2);

        let runtime = RuntimeBuilder::from_config(&config).unwrap();
        let pool = runtime.pool.clone().unwrap();
        assert_eq!(pool.isolation(), Isolation::Shared);
        assert_eq!(pool.nworkers(), 2);

        let pooled = PooledRunner::new(pool)
            .run(&runtime.controller, &runtime.roots)
            .await
            .unwrap();
        assert_eq!(pooled.len(), 3);
        assert!(pooled
            .iter()
            .flat_map(|output| &output.frames)
            .flat_map(|frame| &frame.items)
            .all(|(_, record)| record.metadata.contains_key(WORKER_MARK)));

        for (output, root) in pooled.iter().zip(&runtime.roots) {
            assert_eq!(output.root, *root);
            runtime.controller.clear_data(*root, None).unwrap();
        }
        let serial = run_serial(&runtime.controller, &runtime.roots).unwrap();

        let pooled_values: Vec<_> = pooled.iter().map(|output| output.values()).collect();
        let serial_values: Vec<_> = serial.iter().map(|output| output.values()).collect();
        assert_eq!(pooled_values, serial_values);
        assert_eq!(serial[1].frames[0].keys(), vec![0, 1]);
    }

    /// Test that a TOML configuration builds an isolated pool
    #[tokio::test]
    async fn test_isolated_tracks_toml_loading() {
        let config = load_and_validate_config("configs/isolated-tracks.toml").unwrap();
        assert_eq!(config.pool.mode, PoolMode::Isolated);
        assert_eq!(config.engine.failure_strategy, FailureStrategy::FailFast);

        let runtime = RuntimeBuilder::from_config(&config).unwrap();
        let pool = runtime.pool.clone().unwrap();
        assert_eq!(pool.isolation(), Isolation::Isolated);
        assert_eq!(pool.nworkers(), 3);

        let serial = run_serial(&runtime.controller, &runtime.roots).unwrap();
        let pooled = PooledRunner::new(pool)
            .run(&runtime.controller, &runtime.roots)
            .await
            .unwrap();

        assert_eq!(pooled.len(), 2);
        assert_eq!(pooled[0].item_count(), 5);
        assert_eq!(pooled[1].frames[0].keys(), vec![0]);
        assert_eq!(
            pooled.iter().map(|output| output.values()).collect::<Vec<_>>(),
            serial.iter().map(|output| output.values()).collect::<Vec<_>>()
        );
    }

    /// Test that validation problems surface through the loader
    #[test]
    fn test_invalid_configuration_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
processors: [simulator]
pool: {{ mode: threads, nworkers: 0 }}
tracks:
  - root: {{ tasktype: simulator, kind: root }}
    tasks: [{{ tasktype: scale }}]
"#
        )
        .unwrap();

        match load_and_validate_config(file.path()) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 2, "{errors:?}");
                assert!(errors.iter().any(|e| e.contains("nworkers")));
                assert!(errors.iter().any(|e| e.contains("'scale'")));
            }
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    /// Test that configured tracks open in order with the configured task order
    #[test]
    fn test_runtime_applies_task_order() {
        let config = load_and_validate_config("configs/simple-track.yaml").unwrap();
        let runtime = RuntimeBuilder::from_config(&config).unwrap();

        assert_eq!(
            runtime.controller.task_order().types(),
            &["selection".to_string(), "scale".to_string(), "summary".to_string()]
        );
        assert_eq!(runtime.controller.roots(), runtime.roots);
    }
}
