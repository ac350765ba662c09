// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry kernel boundary
//!
//! A kernel imports a solid from a file and tessellates it into per-face
//! triangulations. Face nodes live in face-local space; `location` maps
//! them into model space (millimetres).

use nalgebra::{Matrix4, Point3};
use std::path::Path;
use thiserror::Error;

/// Errors reported by a geometry kernel
#[derive(Error, Debug)]
pub enum KernelError {
    /// File missing, unreadable or not a STEP exchange structure
    #[error("cannot read model: {0}")]
    Read(String),

    /// Import succeeded but found no solid or shell roots
    #[error("model contains no shapes")]
    Empty,

    /// Meshing failed
    #[error("tessellation failed: {0}")]
    Tessellation(String),
}

impl From<crate::Error> for KernelError {
    fn from(err: crate::Error) -> Self {
        KernelError::Tessellation(err.to_string())
    }
}

impl From<stepmesh_core::Error> for KernelError {
    fn from(err: stepmesh_core::Error) -> Self {
        KernelError::Tessellation(err.to_string())
    }
}

/// Meshing tolerances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessellationParams {
    /// Maximum chord deviation in millimetres
    pub deflection: f64,
    /// Maximum angle between adjacent segments in radians
    pub angle: f64,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            deflection: 0.2,
            angle: 0.5,
        }
    }
}

impl TessellationParams {
    pub fn new(deflection: f64, angle: f64) -> Self {
        Self { deflection, angle }
    }

    /// Both tolerances must be finite and positive
    pub fn validate(&self) -> Result<(), KernelError> {
        if !(self.deflection.is_finite() && self.deflection > 0.0) {
            return Err(KernelError::Tessellation(format!(
                "linear deflection must be positive, got {}",
                self.deflection
            )));
        }
        if !(self.angle.is_finite() && self.angle > 0.0) {
            return Err(KernelError::Tessellation(format!(
                "angular deflection must be positive, got {}",
                self.angle
            )));
        }
        Ok(())
    }
}

/// Face orientation relative to its underlying surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Forward,
    Reversed,
}

impl Orientation {
    /// Map a STEP `same_sense` flag
    #[inline]
    pub fn from_same_sense(same_sense: bool) -> Self {
        if same_sense {
            Orientation::Forward
        } else {
            Orientation::Reversed
        }
    }

    #[inline]
    pub fn is_reversed(self) -> bool {
        self == Orientation::Reversed
    }

    /// Flip when `flip` is set
    #[inline]
    pub fn flipped_if(self, flip: bool) -> Self {
        match (self, flip) {
            (o, false) => o,
            (Orientation::Forward, true) => Orientation::Reversed,
            (Orientation::Reversed, true) => Orientation::Forward,
        }
    }
}

/// Triangulated face in face-local coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triangulation {
    pub nodes: Vec<Point3<f64>>,
    /// 1-based node indices
    pub triangles: Vec<[u32; 3]>,
}

impl Triangulation {
    pub fn new(nodes: Vec<Point3<f64>>, triangles: Vec<[u32; 3]>) -> Self {
        Self { nodes, triangles }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// One face as produced by a kernel
#[derive(Debug, Clone, PartialEq)]
pub struct FaceTessellation {
    pub triangulation: Option<Triangulation>,
    pub orientation: Orientation,
    /// Local-to-model affine transform
    pub location: Matrix4<f64>,
}

impl FaceTessellation {
    pub fn new(triangulation: Triangulation, orientation: Orientation, location: Matrix4<f64>) -> Self {
        Self {
            triangulation: Some(triangulation),
            orientation,
            location,
        }
    }

    /// A face the kernel could not mesh
    pub fn untriangulated(orientation: Orientation) -> Self {
        Self {
            triangulation: None,
            orientation,
            location: Matrix4::identity(),
        }
    }
}

/// Capability boundary between the pipeline and a B-rep kernel
pub trait GeometryKernel {
    /// Imported model, owned by one pipeline run
    type Solid;

    /// Read a model file and collect its shape roots
    fn import_solid(&self, path: &Path) -> Result<Self::Solid, KernelError>;

    /// Mesh every face of the solid, in topological order
    fn tessellate(
        &self,
        solid: &Self::Solid,
        params: &TessellationParams,
    ) -> Result<Vec<FaceTessellation>, KernelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_validation() {
        assert!(TessellationParams::default().validate().is_ok());
        assert!(TessellationParams::new(0.0, 0.5).validate().is_err());
        assert!(TessellationParams::new(0.2, -1.0).validate().is_err());
        assert!(TessellationParams::new(f64::NAN, 0.5).validate().is_err());
        assert!(TessellationParams::new(0.2, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_orientation_flip() {
        assert_eq!(Orientation::from_same_sense(false), Orientation::Reversed);
        assert_eq!(Orientation::Forward.flipped_if(true), Orientation::Reversed);
        assert_eq!(Orientation::Reversed.flipped_if(true), Orientation::Forward);
        assert_eq!(Orientation::Reversed.flipped_if(false), Orientation::Reversed);
        assert!(!Orientation::default().is_reversed());
    }
}
