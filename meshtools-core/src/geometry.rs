//! Geometry primitives shared by the render and resample pipelines.

use std::collections::HashSet;

use nalgebra::{Matrix4, Point2, Point3, Vector3};

use crate::error::{MeshError, MeshResult};

/// One corner of a polygon: a position plus optional attribute references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corner {
    pub position: usize,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

impl Corner {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            texcoord: None,
            normal: None,
        }
    }

    pub fn textured(position: usize, texcoord: usize) -> Self {
        Self {
            position,
            texcoord: Some(texcoord),
            normal: None,
        }
    }
}

/// A polygon face with three or more corners.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub corners: Vec<Corner>,
}

impl Face {
    pub fn new(corners: Vec<Corner>) -> Self {
        Self { corners }
    }

    /// Build a face from bare position indices.
    pub fn from_positions(indices: &[usize]) -> Self {
        Self {
            corners: indices.iter().copied().map(Corner::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.corners.iter().map(|c| c.position)
    }
}

/// A polygon mesh with indexed positions and optional texture coordinates
/// and normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Point3<f32>>,
    pub texcoords: Vec<Point2<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub faces: Vec<Face>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, faces: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            texcoords: Vec::new(),
            normals: Vec::new(),
            faces: Vec::with_capacity(faces),
        }
    }

    /// Build an attribute-free mesh from positions and polygon index lists.
    pub fn from_polygons(positions: Vec<Point3<f32>>, polygons: &[Vec<usize>]) -> Self {
        Self {
            positions,
            texcoords: Vec::new(),
            normals: Vec::new(),
            faces: polygons.iter().map(|p| Face::from_positions(p)).collect(),
        }
    }

    pub fn add_position(&mut self, x: f32, y: f32, z: f32) -> usize {
        self.positions.push(Point3::new(x, y, z));
        self.positions.len() - 1
    }

    pub fn add_face(&mut self, face: Face) {
        self.faces.push(face);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Faces as plain position index lists.
    pub fn polygons(&self) -> Vec<Vec<usize>> {
        self.faces.iter().map(|f| f.positions().collect()).collect()
    }

    pub fn has_attributes(&self) -> bool {
        !self.texcoords.is_empty() || !self.normals.is_empty()
    }

    /// Drop texture coordinates and normals, keeping positions and topology.
    pub fn strip_attributes(&mut self) {
        self.texcoords.clear();
        self.normals.clear();
        for face in &mut self.faces {
            for corner in &mut face.corners {
                corner.texcoord = None;
                corner.normal = None;
            }
        }
    }

    /// Number of distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        let mut edges = HashSet::new();
        for face in &self.faces {
            let n = face.len();
            for i in 0..n {
                let a = face.corners[i].position;
                let b = face.corners[(i + 1) % n].position;
                edges.insert((a.min(b), a.max(b)));
            }
        }
        edges.len()
    }

    /// Check that every face has at least three corners and that every
    /// index references an existing element.
    pub fn validate(&self) -> MeshResult<()> {
        for (face_index, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(MeshError::DegenerateFace {
                    face: face_index,
                    corners: face.len(),
                });
            }
            for corner in &face.corners {
                check_index(face_index, "vertex", Some(corner.position), self.positions.len())?;
                check_index(face_index, "texcoord", corner.texcoord, self.texcoords.len())?;
                check_index(face_index, "normal", corner.normal, self.normals.len())?;
            }
        }
        Ok(())
    }

    /// Unit face normal computed with Newell's method so that non-planar
    /// polygons still get a stable orientation. Degenerate faces yield zero.
    pub fn face_normal(&self, face: &Face) -> Vector3<f32> {
        let normal = self.newell(face);
        normal.try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
    }

    fn newell(&self, face: &Face) -> Vector3<f32> {
        let mut normal = Vector3::zeros();
        let n = face.len();
        for i in 0..n {
            let cur = self.positions[face.corners[i].position];
            let next = self.positions[face.corners[(i + 1) % n].position];
            normal.x += (cur.y - next.y) * (cur.z + next.z);
            normal.y += (cur.z - next.z) * (cur.x + next.x);
            normal.z += (cur.x - next.x) * (cur.y + next.y);
        }
        normal
    }

    /// Area-weighted per-position normals for smooth shading.
    pub fn vertex_normals(&self) -> Vec<Vector3<f32>> {
        let mut normals = vec![Vector3::zeros(); self.positions.len()];
        for face in &self.faces {
            let weighted = self.newell(face);
            for index in face.positions() {
                normals[index] += weighted;
            }
        }
        normals
            .into_iter()
            .map(|n| n.try_normalize(1e-12).unwrap_or_else(Vector3::zeros))
            .collect()
    }

    /// Fan-triangulate every face, yielding corner triples in face order.
    pub fn triangles(&self) -> impl Iterator<Item = (usize, [Corner; 3])> + '_ {
        self.faces.iter().enumerate().flat_map(|(face_index, face)| {
            (1..face.len().saturating_sub(1)).map(move |i| {
                (
                    face_index,
                    [face.corners[0], face.corners[i], face.corners[i + 1]],
                )
            })
        })
    }

    /// Axis-aligned bounds, or `None` for a mesh without positions.
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let first = *self.positions.first()?;
        let (min, max) = self
            .positions
            .iter()
            .fold((first, first), |(min, max), p| (min.inf(p), max.sup(p)));
        Some((min, max))
    }

    /// Apply a rigid transform to positions and normals in place.
    pub fn transform(&mut self, matrix: &Matrix4<f32>) {
        for position in &mut self.positions {
            *position = matrix.transform_point(position);
        }
        for normal in &mut self.normals {
            *normal = matrix
                .transform_vector(normal)
                .try_normalize(1e-12)
                .unwrap_or_else(Vector3::zeros);
        }
    }

    /// Create a unit-textured cube with shared corners and quad faces.
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let mut mesh = Self::with_capacity(8, 6);
        for &(x, y, z) in &[
            (-h, -h, -h),
            (h, -h, -h),
            (h, h, -h),
            (-h, h, -h),
            (-h, -h, h),
            (h, -h, h),
            (h, h, h),
            (-h, h, h),
        ] {
            mesh.add_position(x, y, z);
        }
        mesh.texcoords = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];

        // Counter-clockwise when seen from outside
        let quads: [[usize; 4]; 6] = [
            [4, 5, 6, 7], // front (+z)
            [1, 0, 3, 2], // back (-z)
            [7, 6, 2, 3], // top (+y)
            [0, 1, 5, 4], // bottom (-y)
            [5, 1, 2, 6], // right (+x)
            [0, 4, 7, 3], // left (-x)
        ];
        for quad in quads {
            mesh.add_face(Face::new(
                quad.iter()
                    .enumerate()
                    .map(|(uv, &p)| Corner::textured(p, uv))
                    .collect(),
            ));
        }
        mesh
    }
}

fn check_index(face: usize, kind: &'static str, index: Option<usize>, count: usize) -> MeshResult<()> {
    match index {
        Some(i) if i >= count => Err(MeshError::IndexOutOfRange {
            face,
            kind,
            index: i as i64,
            count,
        }),
        _ => Ok(()),
    }
}
