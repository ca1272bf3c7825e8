//! Command-line driver for the metric learning experiment.

mod cli;

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use clap::Parser;
use qform_fit::{run_seeded, ExperimentReport, InteriorPointSolver};
use tracing_subscriber::EnvFilter;

use cli::Args;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.experiment_config();
    let solver = InteriorPointSolver::new(config.fit.solver.clone());

    tracing::info!(
        dim = config.data.dim,
        train = config.data.train_samples,
        test = config.data.test_samples,
        noise = config.data.noise_std,
        seed = config.seed,
        "starting experiment"
    );

    let report = run_seeded(&config, &solver).context("experiment failed")?;
    print_report(&report);

    if let Some(path) = &args.json {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::info!("report written to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &ExperimentReport) {
    println!("Status: {}", report.status);
    println!("Iterations: {} ({} ms)", report.iterations, report.solve_time_ms);
    println!("Optimal S:");
    for row in &report.fitted {
        let cells: Vec<String> = row.iter().map(|v| format!("{:>10.4}", v)).collect();
        println!("  [{}]", cells.join(" "));
    }
    println!("Training MSE: {:.6}", report.train_mse);
    println!("Recovery error: {:.3e}", report.recovery_error);
    println!("MSE: {:.6}", report.test_mse);
}
