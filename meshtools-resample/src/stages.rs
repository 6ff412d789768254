//! Subdivision and decimation stages.

use meshtools_core::decimate::decimate;
use meshtools_core::subdivide::subdivide;
use tracing::info;

use crate::scene::SceneObject;

/// Approximate vertex growth of one subdivision level.
const GROWTH_PER_LEVEL: usize = 4;

/// Subdivision level for taking `current` vertices towards `target`.
///
/// Counts how many times `current` must be quadrupled to reach `target`,
/// subtracts one and floors the result at `min_levels`.
pub fn subdivision_levels(current: usize, target: usize, min_levels: u32) -> u32 {
    let mut count = current;
    let mut iterations: i64 = 0;
    while count > 0 && count < target {
        count = count.saturating_mul(GROWTH_PER_LEVEL);
        iterations += 1;
    }
    let level = (iterations - 1).max(i64::from(min_levels));
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// Decimation ratio, or `None` when no reduction is needed.
pub fn decimation_ratio(current: usize, target: usize) -> Option<f32> {
    if current <= target {
        return None;
    }
    Some((target as f64 / current as f64) as f32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubdivisionStage {
    pub min_levels: u32,
}

impl Default for SubdivisionStage {
    fn default() -> Self {
        Self { min_levels: 1 }
    }
}

impl SubdivisionStage {
    /// Subdivide `object` towards `target` vertices. Returns the level
    /// applied, 0 when skipped.
    pub fn apply(&self, object: &mut SceneObject, target: usize) -> u32 {
        let current = object.vertex_count();
        let levels = subdivision_levels(current, target, self.min_levels);
        info!(current, target, levels, "Subdivision level computed");

        if levels == 0 {
            info!("No subdivision applied as levels are 0");
            return 0;
        }
        object.set_mesh(subdivide(&object.mesh, levels));
        info!(vertices = object.vertex_count(), "Vertices after subdivision");
        levels
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimationStage {
    pub target: usize,
}

impl DecimationStage {
    pub fn new(target: usize) -> Self {
        Self { target }
    }

    /// Collapse `object` towards the target vertex count. Returns the
    /// ratio used, `None` when the object was already small enough.
    pub fn apply(&self, object: &mut SceneObject) -> Option<f32> {
        let current = object.vertex_count();
        let Some(ratio) = decimation_ratio(current, self.target) else {
            info!(current, "No decimation needed");
            return None;
        };
        object.set_mesh(decimate(&object.mesh, ratio));
        info!(
            ratio,
            vertices = object.vertex_count(),
            faces = object.face_count(),
            "Decimation applied"
        );
        Some(ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MeshBuilder;
    use meshtools_core::Mesh;

    fn cube_object() -> SceneObject {
        let cube = Mesh::cube(2.0);
        MeshBuilder::default()
            .build(cube.positions.clone(), &cube.polygons())
            .unwrap()
    }

    #[test]
    fn test_levels_from_growth() {
        // 100 -> 400 -> 1600
        assert_eq!(subdivision_levels(100, 1000, 1), 1);
        assert_eq!(subdivision_levels(100, 1000, 0), 1);
        // 100 -> 400 -> 1600 -> 6400
        assert_eq!(subdivision_levels(100, 5000, 1), 2);
        // 8 -> 32 -> 128
        assert_eq!(subdivision_levels(8, 50, 1), 1);
    }

    #[test]
    fn test_levels_when_target_already_met() {
        assert_eq!(subdivision_levels(1000, 1000, 1), 1);
        assert_eq!(subdivision_levels(5000, 1000, 1), 1);
        assert_eq!(subdivision_levels(5000, 1000, 0), 0);
        assert_eq!(subdivision_levels(100, 300, 0), 0);
    }

    #[test]
    fn test_levels_with_empty_mesh() {
        assert_eq!(subdivision_levels(0, 1000, 1), 1);
        assert_eq!(subdivision_levels(0, 1000, 0), 0);
    }

    #[test]
    fn test_decimation_ratio() {
        let ratio = decimation_ratio(1600, 1000).unwrap();
        assert!((ratio - 0.625).abs() < 1e-6);
        assert_eq!(decimation_ratio(1000, 1000), None);
        assert_eq!(decimation_ratio(26, 50), None);
    }

    #[test]
    fn test_cube_single_level() {
        let mut object = cube_object();
        let levels = SubdivisionStage::default().apply(&mut object, 50);
        assert_eq!(levels, 1);
        assert_eq!(object.vertex_count(), 26);
        assert_eq!(object.face_count(), 24);

        assert_eq!(DecimationStage::new(50).apply(&mut object), None);
        assert_eq!(object.vertex_count(), 26);
    }

    #[test]
    fn test_zero_level_skips_subdivision() {
        let mut object = cube_object();
        let stage = SubdivisionStage { min_levels: 0 };
        assert_eq!(stage.apply(&mut object, 8), 0);
        assert_eq!(object.vertex_count(), 8);
        assert_eq!(object.face_count(), 6);
    }

    #[test]
    fn test_decimation_reduces_vertices() {
        let mut object = cube_object();
        SubdivisionStage::default().apply(&mut object, 400);
        // 8 -> 32 -> 128 -> 512: two levels
        assert_eq!(object.vertex_count(), 98);

        let ratio = DecimationStage::new(40).apply(&mut object).unwrap();
        assert!((ratio - 40.0 / 98.0).abs() < 1e-6);
        assert!(object.vertex_count() < 98);
        assert!(object.mesh.validate().is_ok());
    }
}
