//! Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// A vertex after projection: pixel coordinates, NDC depth and `1/w` for
/// perspective-correct interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
    pub inv_w: f32,
}

/// Default vertical view angle in degrees.
pub const DEFAULT_VIEW_ANGLE: f32 = 30.0;

/// Camera configuration for 3D rendering
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical view angle in degrees.
    pub view_angle: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            view_angle: DEFAULT_VIEW_ANGLE,
            aspect: width as f32 / height.max(1) as f32,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Place the camera at `position`, looking at `target` with `up` as the
    /// view-up direction.
    pub fn look_at(&mut self, position: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) {
        self.position = position;
        self.target = target;
        self.up = up;
    }

    /// Narrow the field of view by `factor`; values above 1 enlarge the
    /// subject.
    pub fn zoom(&mut self, factor: f32) {
        if factor > 0.0 {
            self.view_angle /= factor;
        }
    }

    pub fn fovy(&self) -> f32 {
        self.view_angle.to_radians()
    }

    /// Fit the near and far planes tightly around the given bounds so depth
    /// precision is spent on the model.
    pub fn reset_clipping_range(&mut self, min: &Point3<f32>, max: &Point3<f32>) {
        let center = nalgebra::center(min, max);
        let radius = ((max - min).norm() * 0.5).max(1e-3);
        let direction = (self.target - self.position)
            .try_normalize(1e-12)
            .unwrap_or_else(|| -Vector3::z());
        let distance = (center - self.position).dot(&direction);

        let far = (distance + radius).max(1e-2);
        let near = (distance - radius).max(far * 1e-3);
        self.near = near;
        self.far = far.max(near * 1.01);
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Perspective projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fovy(), self.near, self.far)
    }

    /// Project a 3D point through a precomputed model-view-projection matrix
    /// to screen space. Returns `None` for points outside the depth range.
    pub fn project_to_screen(
        mvp: &Matrix4<f32>,
        point: &Point3<f32>,
        width: u32,
        height: u32,
    ) -> Option<ScreenPoint> {
        let clip: Vector4<f32> = mvp * point.to_homogeneous();

        // Prevent division by near-zero depth values
        if clip.w.abs() < 1e-6 {
            return None;
        }

        let inv_w = 1.0 / clip.w;
        let ndc_x = clip.x * inv_w;
        let ndc_y = clip.y * inv_w;
        let ndc_z = clip.z * inv_w;

        if clip.w < 0.0 || !(-1.0..=1.0).contains(&ndc_z) {
            return None;
        }

        Some(ScreenPoint {
            x: (ndc_x + 1.0) * 0.5 * width as f32,
            y: (1.0 - ndc_y) * 0.5 * height as f32,
            depth: ndc_z,
            inv_w,
        })
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
