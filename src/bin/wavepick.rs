//! CLI harness (§6): reads instance files from a directory, runs the
//! coordinator over each, writes a solution file plus a JSON run receipt.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;

use wavepick_core::coordinator::{self, CoordinatorConfig};
use wavepick_core::deadline::Deadline;
use wavepick_core::error::CoreError;
use wavepick_core::indices::Indices;
use wavepick_core::parse::parse_instance;
use wavepick_core::write::format_solution;

#[derive(Parser)]
#[command(name = "wavepick", about = "Fractional wave-picking optimizer")]
struct Cli {
    /// Directory of `.txt` instance files.
    #[arg(long)]
    input: PathBuf,

    /// Directory solution files (and JSON receipts) are written to.
    #[arg(long)]
    output: PathBuf,

    /// Run every instance single-threaded.
    #[arg(long, conflicts_with = "parallel")]
    sequential: bool,

    /// Run every instance across `W` worker threads.
    #[arg(long, value_name = "W")]
    parallel: Option<usize>,

    /// Wall-clock budget per instance, in seconds. Overridden by
    /// `MAX_WALL_SECONDS` if that environment variable is set.
    #[arg(long, default_value_t = 10)]
    max_wall_seconds: u64,

    /// Master RNG seed; worker seeds are derived from it.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let requested_workers = match cli.parallel {
        Some(w) => w,
        None if cli.sequential => 1,
        None => 1,
    };
    let num_workers = coordinator::resolve_worker_count(requested_workers);

    let wall_seconds = std::env::var("MAX_WALL_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(cli.max_wall_seconds);

    fs::create_dir_all(&cli.output)
        .with_context(|| format!("creating output directory {}", cli.output.display()))?;

    let mut instance_files: Vec<PathBuf> = fs::read_dir(&cli.input)
        .with_context(|| format!("reading input directory {}", cli.input.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    instance_files.sort();

    if instance_files.is_empty() {
        bail!("no .txt instance files found in {}", cli.input.display());
    }

    let mut any_failure = false;
    for path in &instance_files {
        match run_one(path, &cli.output, num_workers, Duration::from_secs(wall_seconds), cli.seed) {
            Ok(()) => {}
            Err(err) => {
                tracing::error!(instance = %path.display(), %err, "instance failed");
                any_failure = true;
            }
        }
    }

    if any_failure {
        bail!("one or more instances failed");
    }
    Ok(())
}

fn run_one(
    path: &Path,
    output_dir: &Path,
    num_workers: usize,
    wall_budget: Duration,
    seed: u64,
) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let instance = parse_instance(&text)?;
    let indices = Indices::build(&instance.warehouse, &instance.backlog);

    let cfg = CoordinatorConfig {
        num_workers,
        master_seed: seed,
        ..CoordinatorConfig::default()
    };
    let stop = AtomicBool::new(false);
    let started = Instant::now();
    let solution = coordinator::run(
        &instance.warehouse,
        &instance.backlog,
        &indices,
        &cfg,
        Deadline::after(wall_budget),
        &stop,
    );
    let elapsed = started.elapsed();

    if solution.is_infeasible_marker() {
        bail!(CoreError::Infeasible);
    }

    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let solution_path = output_dir.join(format!("{stem}.sol"));
    fs::write(&solution_path, format_solution(&solution))
        .with_context(|| format!("writing {}", solution_path.display()))?;

    let receipt = json!({
        "instance": path.file_name().map(|n| n.to_string_lossy()),
        "num_orders": solution.orders().len(),
        "num_aisles": solution.num_aisles(),
        "total_units": solution.total_units,
        "objective": solution.objective,
        "num_workers": num_workers,
        "elapsed_seconds": elapsed.as_secs_f64(),
    });
    let receipt_path = output_dir.join(format!("{stem}.json"));
    fs::write(&receipt_path, serde_json::to_vec_pretty(&receipt)?)
        .with_context(|| format!("writing {}", receipt_path.display()))?;

    tracing::info!(
        instance = %path.display(),
        objective = solution.objective,
        elapsed_s = elapsed.as_secs_f64(),
        "solved"
    );
    Ok(())
}
