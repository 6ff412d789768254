//! Catmull-Clark subdivision for polygon meshes.
//!
//! One level replaces every n-gon with n quads and produces `V + E + F`
//! vertices: the repositioned originals, one point per edge and one per
//! face. Boundary edges use the cubic B-spline boundary rules so open
//! meshes keep their silhouette. Texture coordinates and normals are not
//! carried through; the result holds positions and topology only.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::geometry::{Face, Mesh};

struct Edge {
    a: usize,
    b: usize,
    faces: Vec<usize>,
}

impl Edge {
    fn is_boundary(&self) -> bool {
        self.faces.len() != 2
    }
}

/// Apply `levels` rounds of Catmull-Clark subdivision.
pub fn subdivide(mesh: &Mesh, levels: u32) -> Mesh {
    let mut current = mesh.clone();
    for level in 1..=levels {
        current = catmull_clark(&current);
        debug!(
            level,
            vertices = current.vertex_count(),
            faces = current.face_count(),
            "Subdivision level applied"
        );
    }
    current
}

/// One round of Catmull-Clark subdivision.
pub fn catmull_clark(mesh: &Mesh) -> Mesh {
    let vertex_count = mesh.vertex_count();
    let positions = &mesh.positions;

    // Edge table, keyed by sorted endpoint pair
    let mut edges: Vec<Edge> = Vec::new();
    let mut edge_lookup: HashMap<(usize, usize), usize> = HashMap::new();
    let mut face_edges: Vec<Vec<usize>> = Vec::with_capacity(mesh.face_count());
    for (face_index, face) in mesh.faces.iter().enumerate() {
        let n = face.len();
        let mut ids = Vec::with_capacity(n);
        for i in 0..n {
            let a = face.corners[i].position;
            let b = face.corners[(i + 1) % n].position;
            let key = (a.min(b), a.max(b));
            let id = *edge_lookup.entry(key).or_insert_with(|| {
                edges.push(Edge {
                    a: key.0,
                    b: key.1,
                    faces: Vec::new(),
                });
                edges.len() - 1
            });
            edges[id].faces.push(face_index);
            ids.push(id);
        }
        face_edges.push(ids);
    }

    let face_points: Vec<Point3<f32>> = mesh
        .faces
        .iter()
        .map(|face| centroid(face.positions().map(|i| positions[i])))
        .collect();

    let edge_points: Vec<Point3<f32>> = edges
        .iter()
        .map(|edge| {
            let pa = positions[edge.a].coords;
            let pb = positions[edge.b].coords;
            if edge.is_boundary() {
                Point3::from((pa + pb) * 0.5)
            } else {
                let fa = face_points[edge.faces[0]].coords;
                let fb = face_points[edge.faces[1]].coords;
                Point3::from((pa + pb + fa + fb) * 0.25)
            }
        })
        .collect();

    // Incidence for the vertex rule
    let mut vertex_faces: Vec<Vec<usize>> = vec![Vec::new(); vertex_count];
    for (face_index, face) in mesh.faces.iter().enumerate() {
        for p in face.positions() {
            vertex_faces[p].push(face_index);
        }
    }
    let mut vertex_edges: Vec<Vec<usize>> = vec![Vec::new(); vertex_count];
    for (id, edge) in edges.iter().enumerate() {
        vertex_edges[edge.a].push(id);
        vertex_edges[edge.b].push(id);
    }

    let mut new_positions = Vec::with_capacity(vertex_count + edges.len() + mesh.face_count());
    for v in 0..vertex_count {
        let p = positions[v].coords;
        let incident = &vertex_edges[v];
        let boundary: Vec<&Edge> = incident
            .iter()
            .map(|&id| &edges[id])
            .filter(|e| e.is_boundary())
            .collect();

        let moved = if vertex_faces[v].is_empty() {
            p
        } else if boundary.is_empty() {
            let n = incident.len() as f32;
            let f = centroid(vertex_faces[v].iter().map(|&f| face_points[f])).coords;
            let r = centroid(incident.iter().map(|&id| {
                let e = &edges[id];
                Point3::from((positions[e.a].coords + positions[e.b].coords) * 0.5)
            }))
            .coords;
            (f + r * 2.0 + p * (n - 3.0)) / n
        } else if boundary.len() == 2 {
            let other = |e: &Edge| if e.a == v { e.b } else { e.a };
            let a = positions[other(boundary[0])].coords;
            let b = positions[other(boundary[1])].coords;
            p * 0.75 + (a + b) * 0.125
        } else {
            // Corner or non-manifold vertex: pinned
            p
        };
        new_positions.push(Point3::from(moved));
    }
    new_positions.extend(edge_points);
    new_positions.extend(face_points);

    let edge_base = vertex_count;
    let face_base = vertex_count + edges.len();
    let mut faces = Vec::with_capacity(mesh.faces.iter().map(Face::len).sum());
    for (face_index, face) in mesh.faces.iter().enumerate() {
        let n = face.len();
        let ids = &face_edges[face_index];
        for i in 0..n {
            let prev = ids[(i + n - 1) % n];
            faces.push(vec![
                face.corners[i].position,
                edge_base + ids[i],
                face_base + face_index,
                edge_base + prev,
            ]);
        }
    }

    Mesh::from_polygons(new_positions, &faces)
}

fn centroid(points: impl Iterator<Item = Point3<f32>>) -> Point3<f32> {
    let (sum, count) = points.fold((Vector3::zeros(), 0usize), |(sum, count), p| {
        (sum + p.coords, count + 1)
    });
    if count == 0 {
        Point3::origin()
    } else {
        Point3::from(sum / count as f32)
    }
}
