//! In-place orientation correction of rendered frames.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::animation::list_frames;
use crate::error::TurntableResult;

/// Rotation applied to every frame after rendering. The canvas is
/// expanded to fit, so quarter turns swap width and height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationCorrection {
    None,
    /// 90 degrees counter-clockwise.
    #[default]
    Ccw90,
    Rotate180,
    /// 90 degrees clockwise.
    Cw90,
}

impl OrientationCorrection {
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::None => image,
            Self::Ccw90 => image.rotate270(),
            Self::Rotate180 => image.rotate180(),
            Self::Cw90 => image.rotate90(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ccw90 => "ccw90",
            Self::Rotate180 => "rotate180",
            Self::Cw90 => "cw90",
        }
    }
}

impl fmt::Display for OrientationCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrientationCorrection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "ccw90" => Ok(Self::Ccw90),
            "rotate180" => Ok(Self::Rotate180),
            "cw90" => Ok(Self::Cw90),
            other => Err(format!(
                "unknown orientation correction '{other}' (expected none, ccw90, rotate180 or cw90)"
            )),
        }
    }
}

/// Rotate every PNG in `dir` by `correction` and overwrite it. Running
/// this twice compounds the rotation.
pub fn rotate_frames(dir: &Path, correction: OrientationCorrection) -> TurntableResult<Vec<PathBuf>> {
    let frames = list_frames(dir)?;
    if correction == OrientationCorrection::None {
        debug!(frames = frames.len(), "Orientation correction disabled");
        return Ok(frames);
    }

    for path in &frames {
        let image = image::open(path)?;
        correction.apply(image).save_with_format(path, ImageFormat::Png)?;
    }
    info!(frames = frames.len(), %correction, "Rotated frames");
    Ok(frames)
}
