//! Turntable configuration.

use std::fs;
use std::path::{Path, PathBuf};

use meshtools_core::logging::LoggingConfig;
use meshtools_core::Axis;
use serde::{Deserialize, Serialize};

use crate::animation::{DitherMethod, SeamPolicy};
use crate::error::{TurntableError, TurntableResult};
use crate::frames::FrameSequence;
use crate::postprocess::OrientationCorrection;
use crate::scene::Resolution;

/// Full pipeline configuration. Missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurntableConfig {
    /// Source mesh.
    pub obj_path: PathBuf,

    /// Colour image bound to the mesh's texture coordinates.
    pub texture_path: PathBuf,

    /// Directory receiving the `screenshot_NNN.png` frames.
    pub output_dir: PathBuf,

    /// Animated GIF output.
    pub gif_path: PathBuf,

    pub render: RenderSettings,

    pub gif: GifSettings,

    pub logging: LoggingConfig,
}

/// Frame rendering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Degrees between consecutive frames.
    pub step_degrees: f64,

    /// Rotation axis through the origin.
    pub axis: Axis,

    pub resolution: Resolution,

    pub smooth_shading: bool,

    /// Rotation applied to the saved frames.
    pub orientation: OrientationCorrection,

    /// Remove `screenshot_*.png` left over from an earlier run.
    pub clear_stale_frames: bool,
}

/// GIF encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GifSettings {
    pub frame_duration_ms: u32,
    pub dither: DitherMethod,
    pub optimize: bool,
    pub seam: SeamPolicy,
}

impl Default for TurntableConfig {
    fn default() -> Self {
        Self {
            obj_path: PathBuf::from("avatar.obj"),
            texture_path: PathBuf::from("texture.png"),
            output_dir: PathBuf::from("3d-screenshots"),
            gif_path: PathBuf::from("avatar-360.gif"),
            render: RenderSettings::default(),
            gif: GifSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            step_degrees: 2.0,
            axis: Axis::X,
            resolution: Resolution::UHD,
            smooth_shading: true,
            orientation: OrientationCorrection::Ccw90,
            clear_stale_frames: true,
        }
    }
}

impl Default for GifSettings {
    fn default() -> Self {
        Self {
            frame_duration_ms: 100,
            dither: DitherMethod::FloydSteinberg,
            optimize: true,
            seam: SeamPolicy::Auto,
        }
    }
}

impl TurntableConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> TurntableResult<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            TurntableError::config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Write this config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> TurntableResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TurntableError::config(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> TurntableResult<()> {
        FrameSequence::new(self.render.step_degrees)?;
        let Resolution { width, height } = self.render.resolution;
        if width == 0 || height == 0 {
            return Err(TurntableError::InvalidResolution { width, height });
        }
        if self.gif.frame_duration_ms == 0 {
            return Err(TurntableError::config("frame_duration_ms must be above zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TurntableConfig::default();
        assert_eq!(config.render.step_degrees, 2.0);
        assert_eq!(config.render.resolution, Resolution::new(3840, 2160));
        assert_eq!(config.render.axis, Axis::X);
        assert_eq!(config.gif.frame_duration_ms, 100);
        assert_eq!(config.gif.dither, DitherMethod::FloydSteinberg);
        assert_eq!(config.gif.seam, SeamPolicy::Auto);
        assert!(config.render.clear_stale_frames);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "obj_path": "model.obj",
            "render": { "step_degrees": 5.0, "orientation": "cw90" },
            "gif": { "dither": "none", "seam": "keep-all" }
        }"#;
        let config: TurntableConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.obj_path, PathBuf::from("model.obj"));
        assert_eq!(config.texture_path, PathBuf::from("texture.png"));
        assert_eq!(config.render.step_degrees, 5.0);
        assert_eq!(config.render.orientation, OrientationCorrection::Cw90);
        assert!(config.render.smooth_shading);
        assert_eq!(config.gif.dither, DitherMethod::None);
        assert_eq!(config.gif.seam, SeamPolicy::KeepAll);
        assert!(config.gif.optimize);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turntable.json");
        let mut config = TurntableConfig::default();
        config.render.resolution = Resolution::FULL_HD;
        config.logging.json = true;
        config.save(&path).unwrap();

        assert_eq!(TurntableConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turntable.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            TurntableConfig::load(&path),
            Err(TurntableError::Config { .. })
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = TurntableConfig::default();
        config.render.step_degrees = 0.0;
        assert!(matches!(config.validate(), Err(TurntableError::InvalidStep { .. })));
        config.render.step_degrees = 1e-6;
        assert!(matches!(config.validate(), Err(TurntableError::InvalidStep { .. })));

        let mut config = TurntableConfig::default();
        config.render.resolution = Resolution::new(640, 0);
        assert!(matches!(
            config.validate(),
            Err(TurntableError::InvalidResolution { .. })
        ));

        let mut config = TurntableConfig::default();
        config.gif.frame_duration_ms = 0;
        assert!(matches!(config.validate(), Err(TurntableError::Config { .. })));
    }
}
