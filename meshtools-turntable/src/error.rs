//! Error types for the turntable pipeline.

use std::path::PathBuf;

use meshtools_core::MeshError;

/// Errors raised while rendering frames or assembling the GIF.
#[derive(Debug, thiserror::Error)]
pub enum TurntableError {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("GIF encoding error: {0}")]
    Gif(#[from] gif::EncodingError),

    #[error(
        "invalid rotation step {step}: expected finite degrees above zero giving at most {} frames",
        crate::frames::MAX_FRAMES
    )]
    InvalidStep { step: f64 },

    #[error("invalid resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    #[error("no PNG frames found in {dir}")]
    NoFrames { dir: PathBuf },

    #[error("frame {path} is {actual_width}x{actual_height}, expected {width}x{height}")]
    FrameSizeMismatch {
        path: PathBuf,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("GIF canvas {width}x{height} exceeds 65535 pixels per side")]
    CanvasTooLarge { width: u32, height: u32 },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using TurntableError.
pub type TurntableResult<T> = Result<T, TurntableError>;

impl TurntableError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
