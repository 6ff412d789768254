//! Error types for mesh loading, validation and export.

use std::path::PathBuf;

/// Errors raised while reading, validating or writing a mesh.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("face {face} references {kind} {index}, but the mesh has {count}")]
    IndexOutOfRange {
        face: usize,
        kind: &'static str,
        index: i64,
        count: usize,
    },

    #[error("face {face} has {corners} corners; at least 3 are required")]
    DegenerateFace { face: usize, corners: usize },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using MeshError.
pub type MeshResult<T> = Result<T, MeshError>;

impl MeshError {
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: msg.into(),
        }
    }
}
