//! meshtools-resample - subdivide and decimate an OBJ towards a vertex count.
//!
//! Usage:
//!   meshtools-resample [--min-subdivision-levels 0|1] [-v] -- INPUT TEXTURE OUTPUT TARGET

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use meshtools_core::logging::{init_logging, LoggingConfig};
use meshtools_resample::ResampleOptions;

#[derive(Parser)]
#[command(
    name = "meshtools-resample",
    about = "Resample an OBJ mesh towards a target vertex count",
    version,
    author
)]
struct Cli {
    /// Input OBJ mesh
    input: PathBuf,

    /// Texture image bound as the base colour
    texture: PathBuf,

    /// Output OBJ path
    output: PathBuf,

    /// Target vertex count
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    target: u64,

    /// Lowest subdivision level applied, even when the target is already met
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(0..=1))]
    min_subdivision_levels: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    });

    let target = usize::try_from(cli.target).context("target vertex count does not fit in memory")?;
    let mut options = ResampleOptions::new(cli.input, cli.texture, cli.output, target);
    options.min_subdivision_levels = cli.min_subdivision_levels;

    let report = meshtools_resample::run(&options)
        .with_context(|| format!("resampling {}", options.input.display()))?;

    println!(
        "Resampled {} -> {} vertices ({} subdivision levels) into {}",
        report.input_vertices,
        report.export.vertices,
        report.subdivision_levels,
        options.output.display()
    );
    Ok(())
}
