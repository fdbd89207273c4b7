//! Coil Array Build CLI
//!
//! Builds a dipole array and its multiport simulations, then writes a JSON
//! snapshot of the model and solver session.
//!
//! Usage:
//!   build-array --config configs/fractionated_7t.json \
//!               --output array_snapshot.json \
//!               --count 12 --frequency 298 --frequency 596

use anyhow::Result;
use clap::Parser;
use coil_builder::{loader, runner, ExperimentConfig};
use coil_geometry::AntennaKind;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "build-array",
    about = "Build an elliptical dipole array and its multiport simulations"
)]
struct Args {
    /// Path to experiment config JSON; built-in defaults when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON snapshot
    #[arg(short, long, default_value = "array_snapshot.json")]
    output: PathBuf,

    /// Override the number of antennas
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Override the antenna kind (plain, lumped, fractionated)
    #[arg(short, long)]
    kind: Option<AntennaKind>,

    /// Override the simulation frequencies in MHz (repeatable)
    #[arg(short, long = "frequency")]
    frequency: Vec<u32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut ExperimentConfig) {
        if let Some(count) = self.count {
            config.count = count;
        }
        if let Some(kind) = self.kind {
            config.antenna.kind = kind;
        }
        if !self.frequency.is_empty() {
            config.frequencies_mhz = self.frequency.clone();
        }
    }
}

/// `RUST_LOG` wins over `--verbose`
fn log_directives(verbose: bool, rust_log: Option<String>) -> String {
    let level = if verbose { "debug" } else { "info" };
    rust_log.unwrap_or_else(|| level.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::new(log_directives(
            args.verbose,
            std::env::var("RUST_LOG").ok(),
        )))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    info!("{}", "=".repeat(60));
    info!("RF Coil Array Builder");
    info!("{}", "=".repeat(60));

    let mut config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => ExperimentConfig::default(),
    };
    args.apply_overrides(&mut config);

    let output = runner::run(&config)?;

    info!("\nWriting snapshot to {:?}", args.output);
    let file = File::create(&args.output)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &output)?;

    // Summary
    info!("\n{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!(
        "Array: {} ({} elements)",
        output.summary.array.name, output.metadata.element_count
    );
    info!("Entities in model: {}", output.metadata.entity_count);
    for sim in &output.summary.simulations {
        info!(
            "  {} | {} ports | {}",
            sim.name,
            sim.ports.len(),
            sim.tissue.field_label
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directives() {
        assert_eq!(log_directives(false, None), "info");
        assert_eq!(log_directives(true, None), "debug");
        assert_eq!(
            log_directives(true, Some("coil_simulation=trace".to_string())),
            "coil_simulation=trace"
        );
    }
}
