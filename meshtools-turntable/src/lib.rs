//! meshtools turntable - render a textured mesh spinning about an axis
//!
//! Renders one transparent PNG per rotation step, corrects the frame
//! orientation in place and assembles the frames into a looping GIF.

pub mod animation;
pub mod config;
pub mod error;
pub mod frames;
pub mod postprocess;
pub mod renderer;
pub mod scene;

use std::fs;
use std::path::PathBuf;

use tracing::info;

pub use animation::{DitherMethod, GifAssembler, GifSummary, SeamPolicy};
pub use config::TurntableConfig;
pub use error::{TurntableError, TurntableResult};
pub use frames::{FrameRenderer, FrameSequence};
pub use postprocess::OrientationCorrection;
pub use renderer::{RasterRenderer, Shading, Texture};
pub use scene::{CameraPreset, RenderSurface, Resolution, SceneSetup};

/// Outputs of a full turntable run.
#[derive(Debug, Clone)]
pub struct TurntableReport {
    /// Frames in angle order, after orientation correction.
    pub frames: Vec<PathBuf>,
    pub gif: GifSummary,
}

/// Render all frames, correct their orientation and write the GIF.
pub fn run(config: &TurntableConfig) -> TurntableResult<TurntableReport> {
    config.validate()?;
    let sequence = FrameSequence::new(config.render.step_degrees)?;

    fs::create_dir_all(&config.output_dir)?;
    if config.render.clear_stale_frames {
        frames::remove_stale_frames(&config.output_dir)?;
    }

    let setup = SceneSetup::new(config.render.resolution, config.render.smooth_shading);
    let mut surface = RenderSurface::open(&setup)?;
    surface.set_texture(Texture::load(&config.texture_path)?);
    info!(
        obj = %config.obj_path.display(),
        frames = sequence.len(),
        step = sequence.step(),
        width = setup.resolution.width,
        height = setup.resolution.height,
        "Rendering turntable"
    );

    let renderer = FrameRenderer::new(&config.obj_path, config.render.axis, &config.output_dir);
    let rendered = renderer.render_all(&mut surface, &sequence);
    surface.close();
    let rendered = rendered?;

    postprocess::rotate_frames(&config.output_dir, config.render.orientation)?;

    let assembler = GifAssembler {
        frame_duration_ms: config.gif.frame_duration_ms,
        dither: config.gif.dither,
        optimize: config.gif.optimize,
        drop_last: config.gif.seam.drops_last(&sequence),
        ..GifAssembler::default()
    };
    let gif = assembler.assemble(&config.output_dir, &config.gif_path)?;

    Ok(TurntableReport {
        frames: rendered,
        gif,
    })
}
