//! meshtools resample - move an OBJ mesh towards a target vertex count
//!
//! The mesh is subdivided with Catmull-Clark until it is close to the
//! target, decimated with quadric error metrics if it overshoots, and
//! exported as a plain `v`/`f` OBJ.

pub mod error;
pub mod scene;
pub mod stages;

use std::path::PathBuf;

use meshtools_core::obj::{load_obj, save_obj};
use meshtools_core::{ExportReport, ObjDetail, ObjExport};
use tracing::{info, warn};

pub use error::{ResampleError, ResampleResult};
pub use scene::{Material, MeshBuilder, SceneObject};
pub use stages::{decimation_ratio, subdivision_levels, DecimationStage, SubdivisionStage};

/// Inputs of one resample run.
#[derive(Debug, Clone)]
pub struct ResampleOptions {
    pub input: PathBuf,
    pub texture: PathBuf,
    pub output: PathBuf,
    pub target_vertices: usize,
    /// Floor for the computed subdivision level, 0 or 1.
    pub min_subdivision_levels: u32,
    pub export: ObjExport,
}

impl ResampleOptions {
    pub fn new(input: PathBuf, texture: PathBuf, output: PathBuf, target_vertices: usize) -> Self {
        Self {
            input,
            texture,
            output,
            target_vertices,
            min_subdivision_levels: 1,
            export: ObjExport::GeometryOnly,
        }
    }
}

/// Counts gathered along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleReport {
    pub input_vertices: usize,
    pub subdivision_levels: u32,
    pub subdivided_vertices: usize,
    pub decimation_ratio: Option<f32>,
    pub export: ExportReport,
}

pub fn run(options: &ResampleOptions) -> ResampleResult<ResampleReport> {
    if options.target_vertices == 0 {
        return Err(ResampleError::InvalidTarget {
            target: options.target_vertices,
        });
    }

    let source = load_obj(&options.input, ObjDetail::Geometry)?;
    let builder = MeshBuilder::default();
    let polygons = source.polygons();
    let mut object = builder.build(source.positions, &polygons)?;
    builder.bind_texture(&mut object, &options.texture)?;

    let input_vertices = object.vertex_count();
    info!(
        input = %options.input.display(),
        vertices = input_vertices,
        faces = object.face_count(),
        target = options.target_vertices,
        "Mesh loaded"
    );

    let subdivision = SubdivisionStage {
        min_levels: options.min_subdivision_levels,
    };
    let levels = subdivision.apply(&mut object, options.target_vertices);
    let subdivided_vertices = object.vertex_count();

    let ratio = DecimationStage::new(options.target_vertices).apply(&mut object);

    let export = save_obj(&options.output, &object.mesh, options.export)?;
    if export.is_lossy() {
        warn!(
            texcoords = export.dropped_texcoords,
            normals = export.dropped_normals,
            "Export dropped vertex attributes"
        );
    }
    info!(
        output = %options.output.display(),
        vertices = export.vertices,
        faces = export.faces,
        "Resampled OBJ exported"
    );

    Ok(ResampleReport {
        input_vertices,
        subdivision_levels: levels,
        subdivided_vertices,
        decimation_ratio: ratio,
        export,
    })
}
