//! meshtools-turntable - render a textured OBJ as a 360 degree GIF.
//!
//! Usage:
//!   meshtools-turntable [--config turntable.json] [--obj PATH] [--texture PATH] ...
//!
//! Command-line options override the JSON config, which overrides the
//! built-in defaults.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use meshtools_core::logging::{init_logging, LoggingConfig};
use meshtools_turntable::{DitherMethod, Resolution, SeamPolicy, TurntableConfig};

#[derive(Parser)]
#[command(
    name = "meshtools-turntable",
    about = "Render a textured OBJ as turntable PNG frames and a looping GIF",
    version,
    author
)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source OBJ mesh
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Texture image
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Directory for the PNG frames
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Output GIF path
    #[arg(long)]
    gif: Option<PathBuf>,

    /// Rotation step in degrees
    #[arg(long)]
    step: Option<f64>,

    /// Frame width in pixels
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Frame height in pixels
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// GIF frame duration in milliseconds
    #[arg(long)]
    duration_ms: Option<u32>,

    /// Flat instead of smooth shading
    #[arg(long)]
    flat: bool,

    /// Dithering: none|floyd-steinberg
    #[arg(long)]
    dither: Option<DitherMethod>,

    /// Seam frame handling: auto|drop-last|keep-all
    #[arg(long)]
    seam: Option<SeamPolicy>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<TurntableConfig> {
        let mut config = match &self.config {
            Some(path) => TurntableConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => TurntableConfig::default(),
        };

        if let Some(obj) = self.obj {
            config.obj_path = obj;
        }
        if let Some(texture) = self.texture {
            config.texture_path = texture;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(gif) = self.gif {
            config.gif_path = gif;
        }
        if let Some(step) = self.step {
            config.render.step_degrees = step;
        }
        if let (Some(width), Some(height)) = (self.width, self.height) {
            config.render.resolution = Resolution::new(width, height);
        }
        if let Some(ms) = self.duration_ms {
            config.gif.frame_duration_ms = ms;
        }
        if self.flat {
            config.render.smooth_shading = false;
        }
        if let Some(dither) = self.dither {
            config.gif.dither = dither;
        }
        if let Some(seam) = self.seam {
            config.gif.seam = seam;
        }
        if self.verbose {
            config.logging = LoggingConfig {
                json: config.logging.json,
                ..LoggingConfig::verbose()
            };
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    init_logging(&config.logging);

    let report = meshtools_turntable::run(&config).context("turntable render failed")?;

    println!(
        "Wrote {} frames to {} and a {}-frame {}x{} GIF to {}",
        report.frames.len(),
        config.output_dir.display(),
        report.gif.frames,
        report.gif.width,
        report.gif.height,
        report.gif.path.display()
    );
    Ok(())
}
