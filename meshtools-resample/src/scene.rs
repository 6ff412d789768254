//! Scene objects assembled from raw vertex and face lists.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use meshtools_core::Mesh;
use nalgebra::Point3;
use tracing::debug;

use crate::error::{ResampleError, ResampleResult};

/// Name given to imported meshes.
pub const DEFAULT_OBJECT_NAME: &str = "ImportedMesh";

/// Name given to the material created for a bound texture.
pub const DEFAULT_MATERIAL_NAME: &str = "MeshMaterial";

/// Image texture node feeding a material input.
#[derive(Debug, Clone)]
pub struct ImageTexture {
    pub path: PathBuf,
    pub image: RgbaImage,
}

/// Surface material whose base colour is driven by an image texture.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub base_color: Option<ImageTexture>,
}

/// Named mesh plus the materials bound to it.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub mesh: Mesh,
    pub materials: Vec<Material>,
}

impl SceneObject {
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn face_count(&self) -> usize {
        self.mesh.face_count()
    }

    /// Replace the geometry while keeping name and materials.
    pub fn set_mesh(&mut self, mesh: Mesh) {
        self.mesh = mesh;
    }
}

/// Builds scene objects from vertex and polygon lists.
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    name: String,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_OBJECT_NAME)
    }
}

impl MeshBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Create an object from positions and 0-based polygon index lists.
    /// Fails when any index is out of range or a polygon has fewer than
    /// three corners. A vertex-only object is allowed.
    pub fn build(
        &self,
        vertices: Vec<Point3<f32>>,
        polygons: &[Vec<usize>],
    ) -> ResampleResult<SceneObject> {
        let mesh = Mesh::from_polygons(vertices, polygons);
        mesh.validate()?;
        debug!(
            name = %self.name,
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "Scene object created"
        );
        Ok(SceneObject {
            name: self.name.clone(),
            mesh,
            materials: Vec::new(),
        })
    }

    /// Load `path` and bind it as the base colour of a new material on
    /// `object`.
    pub fn bind_texture(&self, object: &mut SceneObject, path: &Path) -> ResampleResult<()> {
        let image = image::open(path)
            .map_err(|source| ResampleError::Texture {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        debug!(
            object = %object.name,
            texture = %path.display(),
            width = image.width(),
            height = image.height(),
            "Texture bound"
        );
        object.materials.push(Material {
            name: DEFAULT_MATERIAL_NAME.to_string(),
            base_color: Some(ImageTexture {
                path: path.to_path_buf(),
                image,
            }),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtools_core::MeshError;

    fn quad() -> (Vec<Point3<f32>>, Vec<Vec<usize>>) {
        (
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        )
    }

    #[test]
    fn test_build_named_object() {
        let (vertices, faces) = quad();
        let object = MeshBuilder::default().build(vertices, &faces).unwrap();
        assert_eq!(object.name, "ImportedMesh");
        assert_eq!(object.vertex_count(), 4);
        assert_eq!(object.face_count(), 1);
        assert!(object.materials.is_empty());
    }

    #[test]
    fn test_build_rejects_bad_index() {
        let (vertices, _) = quad();
        let err = MeshBuilder::default()
            .build(vertices, &[vec![0, 1, 9]])
            .unwrap_err();
        assert!(matches!(
            err,
            ResampleError::Mesh(MeshError::IndexOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn test_build_accepts_vertex_only() {
        let (vertices, _) = quad();
        let object = MeshBuilder::default().build(vertices, &[]).unwrap();
        assert_eq!(object.vertex_count(), 4);
        assert_eq!(object.face_count(), 0);

        let empty = MeshBuilder::default().build(Vec::new(), &[]).unwrap();
        assert_eq!(empty.vertex_count(), 0);
    }

    #[test]
    fn test_bind_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skin.png");
        RgbaImage::new(3, 2).save(&path).unwrap();

        let (vertices, faces) = quad();
        let builder = MeshBuilder::new("Avatar");
        let mut object = builder.build(vertices, &faces).unwrap();
        builder.bind_texture(&mut object, &path).unwrap();

        assert_eq!(object.materials.len(), 1);
        let texture = object.materials[0].base_color.as_ref().unwrap();
        assert_eq!(texture.image.dimensions(), (3, 2));
        assert_eq!(texture.path, path);
    }

    #[test]
    fn test_missing_texture_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (vertices, faces) = quad();
        let builder = MeshBuilder::default();
        let mut object = builder.build(vertices, &faces).unwrap();

        let err = builder
            .bind_texture(&mut object, &dir.path().join("missing.png"))
            .unwrap_err();
        assert!(matches!(err, ResampleError::Texture { .. }));
    }
}
