//! Off-screen RGBA rasterizer
use std::path::Path;

use image::{Rgba, RgbaImage};
use meshtools_core::geometry::Corner;
use meshtools_core::projection::ScreenPoint;
use meshtools_core::{Camera, Mesh, Transform};
use nalgebra::{Matrix4, Point2, Vector3};

/// Light contribution that reaches surfaces facing away from the camera.
const AMBIENT: f32 = 0.2;
/// Headlight strength on surfaces facing the camera.
const DIFFUSE: f32 = 0.8;
/// Surface colour used when no texture is bound.
const BASE_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Normal interpolation across a face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    /// One normal per face
    Flat,
    /// Per-vertex normals blended across the face
    Smooth,
}

impl Shading {
    pub fn from_smooth(smooth: bool) -> Self {
        if smooth {
            Shading::Smooth
        } else {
            Shading::Flat
        }
    }
}

/// An RGBA texture sampled with bilinear filtering and repeat wrapping.
#[derive(Debug, Clone)]
pub struct Texture {
    image: RgbaImage,
}

impl Texture {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, image::ImageError> {
        Ok(Self::from_image(image::open(path)?.to_rgba8()))
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Sample at OBJ texture coordinates (origin bottom-left).
    pub fn sample(&self, uv: Point2<f32>) -> [f32; 4] {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return [1.0; 4];
        }
        let u = uv.x - uv.x.floor();
        let v = 1.0 - (uv.y - uv.y.floor());
        let x = u * w as f32 - 0.5;
        let y = v * h as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;

        let fetch = |xi: f32, yi: f32| -> [f32; 4] {
            let px = (xi as i64).rem_euclid(w as i64) as u32;
            let py = (yi as i64).rem_euclid(h as i64) as u32;
            let p = self.image.get_pixel(px, py);
            [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
        };
        let c00 = fetch(x0, y0);
        let c10 = fetch(x0 + 1.0, y0);
        let c01 = fetch(x0, y0 + 1.0);
        let c11 = fetch(x0 + 1.0, y0 + 1.0);

        let mut out = [0.0; 4];
        for i in 0..4 {
            let top = c00[i] + (c10[i] - c00[i]) * tx;
            let bottom = c01[i] + (c11[i] - c01[i]) * tx;
            out[i] = (top + (bottom - top) * ty) / 255.0;
        }
        out
    }
}

/// Projected triangle corner with its shading inputs
#[derive(Clone, Copy)]
struct RasterVertex {
    screen: ScreenPoint,
    uv: Option<Point2<f32>>,
    light: f32,
}

/// Software renderer that rasterizes triangle meshes into an RGBA buffer
pub struct RasterRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    color_buffer: RgbaImage,
}

impl RasterRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            color_buffer: RgbaImage::new(width as u32, height as u32),
        }
    }

    pub fn clear(&mut self, background: Rgba<u8>) {
        self.depth_buffer.fill(f32::INFINITY);
        for pixel in self.color_buffer.pixels_mut() {
            *pixel = background;
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.color_buffer
    }

    pub fn render_mesh(
        &mut self,
        mesh: &Mesh,
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
        texture: Option<&Texture>,
        shading: Shading,
    ) {
        let mvp = Transform::mvp_matrix(
            model_matrix,
            &camera.view_matrix(),
            &camera.projection_matrix(),
        );
        // Headlight: directional light travelling along the view axis
        let light_dir = (camera.position - camera.target)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::z);

        let smooth_normals = match shading {
            Shading::Smooth => mesh.vertex_normals(),
            Shading::Flat => Vec::new(),
        };

        for (face_index, corners) in mesh.triangles() {
            let face_normal = match shading {
                Shading::Flat => Some(mesh.face_normal(&mesh.faces[face_index])),
                Shading::Smooth => None,
            };

            let mut vertices = [None; 3];
            for (slot, corner) in vertices.iter_mut().zip(corners.iter()) {
                let position = mesh.positions[corner.position];
                let Some(screen) = Camera::project_to_screen(
                    &mvp,
                    &position,
                    self.width as u32,
                    self.height as u32,
                ) else {
                    break;
                };
                let normal = face_normal
                    .unwrap_or_else(|| corner_normal(mesh, corner, &smooth_normals));
                let world_normal = model_matrix.transform_vector(&normal);
                let light = world_normal
                    .try_normalize(1e-12)
                    .map(|n| AMBIENT + DIFFUSE * n.dot(&light_dir).abs())
                    .unwrap_or(AMBIENT);
                let uv = texture
                    .and(corner.texcoord)
                    .and_then(|t| mesh.texcoords.get(t).copied());
                *slot = Some(RasterVertex { screen, uv, light });
            }

            // Skip triangles with a clipped corner
            if let [Some(v0), Some(v1), Some(v2)] = vertices {
                self.rasterize_triangle(&[v0, v1, v2], texture);
            }
        }
    }

    fn rasterize_triangle(&mut self, verts: &[RasterVertex; 3], texture: Option<&Texture>) {
        let [a, b, c] = verts.map(|v| v.screen);

        // Bounding box
        let min_x = a.x.min(b.x).min(c.x).floor() as i32;
        let max_x = a.x.max(b.x).max(c.x).ceil() as i32;
        let min_y = a.y.min(b.y).min(c.y).floor() as i32;
        let max_y = a.y.max(b.y).max(c.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        let textured = texture.filter(|_| verts.iter().all(|v| v.uv.is_some()));

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) = barycentric((a.x, a.y), (b.x, b.y), (c.x, c.y), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                // NDC depth is affine in screen space
                let depth = w0 * a.depth + w1 * b.depth + w2 * c.depth;
                let idx = y as usize * self.width + x as usize;
                if depth >= self.depth_buffer[idx] {
                    continue;
                }
                self.depth_buffer[idx] = depth;

                // Perspective-correct weights for attributes
                let p0 = w0 * a.inv_w;
                let p1 = w1 * b.inv_w;
                let p2 = w2 * c.inv_w;
                let sum = p0 + p1 + p2;
                let (p0, p1, p2) = if sum.abs() > 1e-12 {
                    (p0 / sum, p1 / sum, p2 / sum)
                } else {
                    (w0, w1, w2)
                };

                let light = p0 * verts[0].light + p1 * verts[1].light + p2 * verts[2].light;
                let base = match (textured, verts[0].uv, verts[1].uv, verts[2].uv) {
                    (Some(tex), Some(t0), Some(t1), Some(t2)) => {
                        let uv = Point2::from(t0.coords * p0 + t1.coords * p1 + t2.coords * p2);
                        let s = tex.sample(uv);
                        [s[0], s[1], s[2]]
                    }
                    _ => BASE_COLOR,
                };

                let shade = |c: f32| ((c * light).clamp(0.0, 1.0) * 255.0).round() as u8;
                self.color_buffer.put_pixel(
                    x as u32,
                    y as u32,
                    Rgba([shade(base[0]), shade(base[1]), shade(base[2]), 255]),
                );
            }
        }
    }
}

fn corner_normal(mesh: &Mesh, corner: &Corner, computed: &[Vector3<f32>]) -> Vector3<f32> {
    corner
        .normal
        .and_then(|n| mesh.normals.get(n).copied())
        .or_else(|| computed.get(corner.position).copied())
        .unwrap_or_else(Vector3::zeros)
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn camera() -> Camera {
        let mut camera = Camera::new(64, 64);
        camera.look_at(Point3::new(0.0, 0.0, 10.0), Point3::origin(), Vector3::y());
        camera.reset_clipping_range(&Point3::new(-1.0, -1.0, -1.0), &Point3::new(1.0, 1.0, 1.0));
        camera
    }

    fn opaque_pixels(image: &RgbaImage) -> usize {
        image.pixels().filter(|p| p[3] == 255).count()
    }

    #[test]
    fn test_barycentric_inside_and_outside() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!(w0 > 0.0 && w1 > 0.0 && w2 > 0.0);
        assert!((w0 + w1 + w2 - 1.0).abs() < 1e-6);

        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (5.0, 5.0)).unwrap();
        assert!(w0 < 0.0 || w1 < 0.0 || w2 < 0.0);

        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 1.0)).is_none());
    }

    #[test]
    fn test_clear_makes_transparent() {
        let mut renderer = RasterRenderer::new(8, 4);
        renderer.clear(Rgba([0, 0, 0, 0]));
        assert_eq!(opaque_pixels(renderer.image()), 0);
        assert_eq!(renderer.image().dimensions(), (8, 4));
    }

    #[test]
    fn test_cube_covers_center_only() {
        let mut renderer = RasterRenderer::new(64, 64);
        renderer.clear(Rgba([0, 0, 0, 0]));
        renderer.render_mesh(&Mesh::cube(2.0), &Matrix4::identity(), &camera(), None, Shading::Flat);

        let image = renderer.image();
        assert_eq!(image.get_pixel(32, 32)[3], 255);
        assert_eq!(image.get_pixel(0, 0)[3], 0);
        assert!(opaque_pixels(image) > 100);
        // Front face looks straight at the headlight
        assert_eq!(image.get_pixel(32, 32)[0], 255);
    }

    #[test]
    fn test_texture_colors_surface() {
        let texture = Texture::from_image(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])));
        let mut renderer = RasterRenderer::new(64, 64);
        renderer.clear(Rgba([0, 0, 0, 0]));
        renderer.render_mesh(
            &Mesh::cube(2.0),
            &Matrix4::identity(),
            &camera(),
            Some(&texture),
            Shading::Smooth,
        );
        let center = renderer.image().get_pixel(32, 32);
        assert!(center[0] > 0);
        assert_eq!(center[1], 0);
        assert_eq!(center[2], 0);
    }

    #[test]
    fn test_texture_sample_orientation() {
        // Top row red, bottom row blue; v = 1 is the top of the image
        let mut image = RgbaImage::from_pixel(1, 2, Rgba([0, 0, 255, 255]));
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let texture = Texture::from_image(image);
        let top = texture.sample(Point2::new(0.5, 0.75));
        let bottom = texture.sample(Point2::new(0.5, 0.25));
        assert!(top[0] > top[2]);
        assert!(bottom[2] > bottom[0]);
    }
}
