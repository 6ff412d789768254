//! Error types for the resample pipeline.

use std::path::PathBuf;

use meshtools_core::MeshError;

#[derive(Debug, thiserror::Error)]
pub enum ResampleError {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error("failed to load texture {path}: {source}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid target vertex count {target}: expected a positive integer")]
    InvalidTarget { target: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using ResampleError.
pub type ResampleResult<T> = Result<T, ResampleError>;
