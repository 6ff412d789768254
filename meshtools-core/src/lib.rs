//! meshtools core library - shared geometry and transformation logic
//!
//! Stateless building blocks used by both command-line pipelines:
//! OBJ parsing and export, transformation matrices, camera projection,
//! Catmull-Clark subdivision and quadric-error decimation.

pub mod decimate;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod obj;
pub mod projection;
pub mod subdivide;
pub mod transform;

// Re-export commonly used types
pub use error::{MeshError, MeshResult};
pub use geometry::{Corner, Face, Mesh};
pub use obj::{ExportReport, ObjDetail, ObjExport};
pub use projection::Camera;
pub use transform::{Axis, Transform};
