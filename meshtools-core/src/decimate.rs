//! Quadric error metric decimation.
//!
//! Edge-collapse simplification after Garland and Heckbert. The mesh is
//! triangulated, every vertex accumulates the plane quadrics of its
//! triangles, and the cheapest edge is collapsed repeatedly until the
//! triangle count drops to `ratio` of the input. Boundary edges get an
//! extra perpendicular constraint plane so open borders are not eaten
//! away. The output is a triangle mesh without attributes.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use nalgebra::{Matrix3, Matrix4, Point3, Vector3, Vector4};
use tracing::debug;

use crate::geometry::Mesh;

type Quadric = Matrix4<f64>;

/// Weight of the constraint planes along open borders.
const BOUNDARY_WEIGHT: f64 = 1000.0;

#[derive(Debug)]
struct Candidate {
    cost: f64,
    a: usize,
    b: usize,
    stamp_a: u32,
    stamp_b: u32,
    target: Vector3<f64>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Reversed so the max-heap pops the cheapest collapse first
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost)
    }
}

struct Simplifier {
    positions: Vec<Vector3<f64>>,
    quadrics: Vec<Quadric>,
    triangles: Vec<[usize; 3]>,
    alive: Vec<bool>,
    alive_count: usize,
    vertex_triangles: Vec<Vec<usize>>,
    removed: Vec<bool>,
    stamps: Vec<u32>,
    heap: BinaryHeap<Candidate>,
}

/// Reduce the triangle count of `mesh` to roughly `ratio` of its
/// triangulated size. Ratios at or above 1 return the mesh unchanged.
pub fn decimate(mesh: &Mesh, ratio: f32) -> Mesh {
    if ratio.is_nan() || ratio >= 1.0 {
        return mesh.clone();
    }
    let ratio = ratio.max(0.0) as f64;

    let triangles: Vec<[usize; 3]> = mesh
        .triangles()
        .map(|(_, c)| [c[0].position, c[1].position, c[2].position])
        .filter(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
        .collect();
    if triangles.is_empty() {
        return mesh.clone();
    }
    let target = ((triangles.len() as f64 * ratio).ceil() as usize).max(1);

    let mut simplifier = Simplifier::new(mesh, triangles);
    let before = simplifier.alive_count;
    simplifier.run(target);
    debug!(
        before,
        after = simplifier.alive_count,
        target,
        "Decimation collapsed edges"
    );
    simplifier.into_mesh()
}

impl Simplifier {
    fn new(mesh: &Mesh, triangles: Vec<[usize; 3]>) -> Self {
        let positions: Vec<Vector3<f64>> = mesh
            .positions
            .iter()
            .map(|p| p.coords.cast::<f64>())
            .collect();
        let n = positions.len();

        let mut quadrics = vec![Quadric::zeros(); n];
        let mut vertex_triangles = vec![Vec::new(); n];
        let mut edge_use: HashMap<(usize, usize), (usize, usize)> = HashMap::new();

        for (t, tri) in triangles.iter().enumerate() {
            let [p0, p1, p2] = tri.map(|i| positions[i]);
            let cross = (p1 - p0).cross(&(p2 - p0));
            let area = cross.norm() * 0.5;
            if let Some(normal) = cross.try_normalize(1e-15) {
                let q = plane_quadric(&normal, &p0) * area;
                for &v in tri {
                    quadrics[v] += q;
                }
            }
            for &v in tri {
                vertex_triangles[v].push(t);
            }
            for i in 0..3 {
                let (a, b) = (tri[i], tri[(i + 1) % 3]);
                let entry = edge_use.entry((a.min(b), a.max(b))).or_insert((0, t));
                entry.0 += 1;
            }
        }

        // Constraint planes along edges used by a single triangle
        for (&(a, b), &(uses, t)) in &edge_use {
            if uses != 1 {
                continue;
            }
            let tri = triangles[t];
            let face_normal = (positions[tri[1]] - positions[tri[0]])
                .cross(&(positions[tri[2]] - positions[tri[0]]));
            let edge = positions[b] - positions[a];
            if let Some(normal) = edge.cross(&face_normal).try_normalize(1e-15) {
                let q = plane_quadric(&normal, &positions[a]) * (BOUNDARY_WEIGHT * edge.norm_squared());
                quadrics[a] += q;
                quadrics[b] += q;
            }
        }

        let alive_count = triangles.len();
        let mut simplifier = Self {
            positions,
            quadrics,
            alive: vec![true; triangles.len()],
            triangles,
            alive_count,
            vertex_triangles,
            removed: vec![false; n],
            stamps: vec![0; n],
            heap: BinaryHeap::with_capacity(edge_use.len()),
        };
        for &(a, b) in edge_use.keys() {
            simplifier.push_candidate(a, b);
        }
        simplifier
    }

    fn push_candidate(&mut self, a: usize, b: usize) {
        let q = self.quadrics[a] + self.quadrics[b];
        let pa = self.positions[a];
        let pb = self.positions[b];
        let mid = (pa + pb) * 0.5;

        let optimal = solve_optimal(&q).filter(|p| (p - mid).norm() <= 2.0 * (pb - pa).norm().max(1e-12));
        let (target, cost) = match optimal {
            Some(p) => (p, quadric_cost(&q, &p)),
            None => [pa, pb, mid]
                .into_iter()
                .map(|p| (p, quadric_cost(&q, &p)))
                .min_by(|x, y| x.1.total_cmp(&y.1))
                .unwrap_or((mid, 0.0)),
        };

        self.heap.push(Candidate {
            cost: cost.max(0.0),
            a,
            b,
            stamp_a: self.stamps[a],
            stamp_b: self.stamps[b],
            target,
        });
    }

    fn run(&mut self, target: usize) {
        while self.alive_count > target {
            let Some(candidate) = self.heap.pop() else {
                break;
            };
            let (a, b) = (candidate.a, candidate.b);
            if self.removed[a]
                || self.removed[b]
                || self.stamps[a] != candidate.stamp_a
                || self.stamps[b] != candidate.stamp_b
            {
                continue;
            }
            if self.flips(a, b, &candidate.target) || self.flips(b, a, &candidate.target) {
                continue;
            }
            self.collapse(a, b, candidate.target);
        }
    }

    /// Whether moving `v` to `target` (while merging with `other`) would
    /// turn any surviving neighbour triangle upside down.
    fn flips(&self, v: usize, other: usize, target: &Vector3<f64>) -> bool {
        for &t in &self.vertex_triangles[v] {
            if !self.alive[t] {
                continue;
            }
            let tri = self.triangles[t];
            if tri.contains(&other) {
                continue;
            }
            let before = self.normal(tri, None);
            let after = self.normal(tri, Some((v, *target)));
            if before.dot(&after) <= 0.0 {
                return true;
            }
        }
        false
    }

    fn normal(&self, tri: [usize; 3], moved: Option<(usize, Vector3<f64>)>) -> Vector3<f64> {
        let p = tri.map(|i| match moved {
            Some((v, target)) if v == i => target,
            _ => self.positions[i],
        });
        (p[1] - p[0]).cross(&(p[2] - p[0]))
    }

    fn collapse(&mut self, keep: usize, drop: usize, target: Vector3<f64>) {
        self.positions[keep] = target;
        let dropped_quadric = self.quadrics[drop];
        self.quadrics[keep] += dropped_quadric;
        self.removed[drop] = true;
        self.stamps[keep] += 1;

        let moved = std::mem::take(&mut self.vertex_triangles[drop]);
        for t in moved {
            if !self.alive[t] {
                continue;
            }
            if self.triangles[t].contains(&keep) {
                self.alive[t] = false;
                self.alive_count -= 1;
            } else {
                for v in &mut self.triangles[t] {
                    if *v == drop {
                        *v = keep;
                    }
                }
                self.vertex_triangles[keep].push(t);
            }
        }

        let alive = &self.alive;
        self.vertex_triangles[keep].retain(|&t| alive[t]);

        let mut neighbours: Vec<usize> = self.vertex_triangles[keep]
            .iter()
            .flat_map(|&t| self.triangles[t])
            .filter(|&v| v != keep)
            .collect();
        neighbours.sort_unstable();
        neighbours.dedup();
        for n in neighbours {
            self.push_candidate(keep, n);
        }
    }

    fn into_mesh(self) -> Mesh {
        let mut remap = vec![usize::MAX; self.positions.len()];
        let mut positions = Vec::new();
        let mut faces = Vec::with_capacity(self.alive_count);
        for (t, tri) in self.triangles.iter().enumerate() {
            if !self.alive[t] {
                continue;
            }
            let face = tri.map(|v| {
                if remap[v] == usize::MAX {
                    remap[v] = positions.len();
                    positions.push(Point3::from(self.positions[v].cast::<f32>()));
                }
                remap[v]
            });
            faces.push(face.to_vec());
        }
        Mesh::from_polygons(positions, &faces)
    }
}

fn plane_quadric(normal: &Vector3<f64>, point: &Vector3<f64>) -> Quadric {
    let d = -normal.dot(point);
    let p = Vector4::new(normal.x, normal.y, normal.z, d);
    p * p.transpose()
}

fn quadric_cost(q: &Quadric, p: &Vector3<f64>) -> f64 {
    let v = Vector4::new(p.x, p.y, p.z, 1.0);
    v.dot(&(q * v))
}

fn solve_optimal(q: &Quadric) -> Option<Vector3<f64>> {
    let a: Matrix3<f64> = q.fixed_view::<3, 3>(0, 0).into_owned();
    if a.determinant().abs() < 1e-12 {
        return None;
    }
    let b = -Vector3::new(q[(0, 3)], q[(1, 3)], q[(2, 3)]);
    a.try_inverse().map(|inv| inv * b)
}
