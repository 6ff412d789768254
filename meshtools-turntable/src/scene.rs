//! Scene setup and the off-screen render surface.
//!
//! The surface is an explicit handle with an open, configure, use, close
//! lifecycle. It owns the camera, the bound texture, the meshes currently
//! in the scene and the pixel buffers; nothing lives in global state.

use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};
use meshtools_core::{Camera, Mesh};
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TurntableError, TurntableResult};
use crate::renderer::{RasterRenderer, Shading, Texture};

/// Output resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const UHD: Resolution = Resolution::new(3840, 2160);
    pub const FULL_HD: Resolution = Resolution::new(1920, 1080);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::UHD
    }
}

/// Camera placement chosen for an output resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPreset {
    pub position: Point3<f32>,
    pub focal_point: Point3<f32>,
    pub view_up: Vector3<f32>,
    /// `None` keeps the default view angle.
    pub zoom: Option<f32>,
}

impl CameraPreset {
    /// Look up the preset for `resolution`. 4K and 1080p have tuned
    /// positions and zoom factors; anything else falls back to the 4K
    /// position without zoom.
    pub fn for_resolution(resolution: Resolution) -> Self {
        let focal_point = Point3::new(1.0, 0.0, 0.0);
        let view_up = Vector3::new(0.0, 1.0, 0.0);
        match resolution {
            Resolution::UHD => Self {
                position: Point3::new(0.0, 0.0, 10.0),
                focal_point,
                view_up,
                zoom: Some(4.0),
            },
            Resolution::FULL_HD => Self {
                position: Point3::new(0.0, 0.0, 5.0),
                focal_point,
                view_up,
                zoom: Some(2.0),
            },
            _ => Self {
                position: Point3::new(0.0, 0.0, 10.0),
                focal_point,
                view_up,
                zoom: None,
            },
        }
    }
}

/// Everything needed to open a render surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSetup {
    pub resolution: Resolution,
    pub camera: CameraPreset,
    pub shading: Shading,
    pub background: Rgba<u8>,
}

impl SceneSetup {
    /// Transparent background, camera from the resolution preset.
    pub fn new(resolution: Resolution, smooth_shading: bool) -> Self {
        Self {
            resolution,
            camera: CameraPreset::for_resolution(resolution),
            shading: Shading::from_smooth(smooth_shading),
            background: Rgba([0, 0, 0, 0]),
        }
    }
}

/// Off-screen render surface.
pub struct RenderSurface {
    renderer: RasterRenderer,
    camera: Camera,
    shading: Shading,
    background: Rgba<u8>,
    texture: Option<Texture>,
    meshes: Vec<Mesh>,
}

impl RenderSurface {
    pub fn open(setup: &SceneSetup) -> TurntableResult<Self> {
        let Resolution { width, height } = setup.resolution;
        if width == 0 || height == 0 {
            return Err(TurntableError::InvalidResolution { width, height });
        }

        let preset = setup.camera;
        let mut camera = Camera::new(width, height);
        camera.look_at(preset.position, preset.focal_point, preset.view_up);
        if let Some(zoom) = preset.zoom {
            camera.zoom(zoom);
        }

        let mut renderer = RasterRenderer::new(width as usize, height as usize);
        renderer.clear(setup.background);
        debug!(width, height, view_angle = camera.view_angle, "Render surface opened");

        Ok(Self {
            renderer,
            camera,
            shading: setup.shading,
            background: setup.background,
            texture: None,
            meshes: Vec::new(),
        })
    }

    pub fn set_texture(&mut self, texture: Texture) {
        self.texture = Some(texture);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Remove every mesh from the scene.
    pub fn clear(&mut self) {
        self.meshes.clear();
    }

    pub fn add_mesh(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    /// Draw the current scene into the pixel buffer.
    pub fn render(&mut self) {
        self.renderer.clear(self.background);

        let bounds = self
            .meshes
            .iter()
            .filter_map(Mesh::bounds)
            .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.inf(&min_b), max_a.sup(&max_b)));
        if let Some((min, max)) = bounds {
            self.camera.reset_clipping_range(&min, &max);
        }

        let model = Matrix4::identity();
        for mesh in &self.meshes {
            self.renderer.render_mesh(
                mesh,
                &model,
                &self.camera,
                self.texture.as_ref(),
                self.shading,
            );
        }
    }

    pub fn image(&self) -> &RgbaImage {
        self.renderer.image()
    }

    /// Write the last rendered frame as a PNG with its alpha channel.
    pub fn screenshot(&self, path: impl AsRef<Path>) -> TurntableResult<()> {
        self.renderer
            .image()
            .save_with_format(path.as_ref(), ImageFormat::Png)?;
        Ok(())
    }

    pub fn close(self) {
        debug!(meshes = self.meshes.len(), "Render surface closed");
    }
}
