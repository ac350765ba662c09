//! STEP Mesh Geometry Processing
//!
//! B-rep tessellation for STEP models: a kernel boundary, the STEP kernel on
//! truck (assembly placements and length units resolved from the file) and
//! mesh extraction into flat buffers, using nalgebra for transformations.

pub mod bounds;
pub mod error;
pub mod extract;
pub mod kernel;
pub mod math;
pub mod mesh;
pub mod step;
pub mod transform;
pub mod units;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point3, Vector3};

pub use bounds::Bounds;
pub use error::{Error, Result};
pub use extract::{Extraction, MeshExtractor};
pub use kernel::{
    FaceTessellation, GeometryKernel, KernelError, Orientation, TessellationParams, Triangulation,
};
pub use math::{cross, normalize, subtract};
pub use mesh::MeshBuffer;
pub use step::{ShellInstance, StepKernel, StepSolid};
pub use units::{unit_scale, OutputUnit};
