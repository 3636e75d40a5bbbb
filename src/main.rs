// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use std::env;
use std::time::Instant;
use the_tasktree::config::{load_and_validate_config, RuntimeBuilder};
use the_tasktree::engine::{run_serial, PooledRunner, RootOutput};
use the_tasktree::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <config.yaml|config.toml> [config ...]", args[0]);
        eprintln!("Example: {} configs/simple-track.yaml", args[0]);
        eprintln!(
            "Example: {} configs/threaded-tracks.yaml configs/isolated-tracks.toml",
            args[0]
        );
        std::process::exit(1);
    }

    println!("🌳 Task Tree");
    println!("═══════════════════════════════════");

    let mut failures = 0;
    for (i, config_file) in args[1..].iter().enumerate() {
        if i > 0 {
            println!("\n{}", "─".repeat(80));
        }
        if let Err(e) = run_single_config(config_file).await {
            eprintln!("❌ Failed to compute {}: {:#}", config_file, e);
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{} configuration(s) failed", failures);
    }
    println!("\n🎉 Done!");
    Ok(())
}

async fn run_single_config(config_file: &str) -> Result<()> {
    let start_time = Instant::now();

    let config = load_and_validate_config(config_file)
        .with_context(|| format!("loading {}", config_file))?;
    let runtime = RuntimeBuilder::from_config(&config).context("building the runtime")?;

    println!("📋 Configuration: {}", config_file);
    println!("🔧 Pool: {:?}", config.pool.mode);
    println!("🛡️  Failure Strategy: {:?}", config.engine.failure_strategy);
    println!("🧵 Tracks: {}", runtime.roots.len());

    let execution_start = Instant::now();
    let outputs = match &runtime.pool {
        Some(pool) => {
            println!("⚙️  Workers: {}", pool.nworkers());
            let outputs = PooledRunner::new(pool.clone())
                .run(&runtime.controller, &runtime.roots)
                .await;
            pool.shutdown();
            outputs?
        }
        None => run_serial(&runtime.controller, &runtime.roots)?,
    };
    let execution_time = execution_start.elapsed();

    println!("\n📊 Results:");
    println!("⏱️  Execution Time: {:?}", execution_time);
    for output in &outputs {
        print_output(&runtime.controller, output)?;
    }

    println!("\n⏱️  Total Time (including config load): {:?}", start_time.elapsed());
    Ok(())
}

fn print_output(
    controller: &the_tasktree::control::TaskController,
    output: &RootOutput,
) -> Result<()> {
    let chain = controller.tasklist(output.root)?;
    let types: Vec<&str> = chain.iter().map(|task| task.tasktype()).collect();
    println!("\n🔄 {} → {}", output.root, types.join(" → "));

    for frame in &output.frames {
        println!("  • frame '{}': {} items", frame.name, frame.items.len());
        for (key, record) in frame.items.iter().take(3) {
            let preview: Vec<String> = record
                .values
                .iter()
                .take(4)
                .map(|v| format!("{:.3}", v))
                .collect();
            let more = if record.len() > 4 { ", ..." } else { "" };
            println!("     {:>4}: [{}{}]", key, preview.join(", "), more);
        }
        if frame.items.len() > 3 {
            println!("     ... and {} more", frame.items.len() - 3);
        }
    }

    let cached = chain
        .iter()
        .map(|task| controller.cache(output.root, task).map(|h| h.get().is_some()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|populated| *populated)
        .count();
    println!("  📝 Cached stages: {}/{}", cached, chain.len());
    Ok(())
}
