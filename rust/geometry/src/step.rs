// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP B-rep kernel
//!
//! Parsing, B-rep conversion and trimmed-surface meshing go through the
//! truck CAD kernel (`truck-stepio`, `truck-meshalgo`). The model length
//! unit and assembly placements are read with `stepmesh-core` and carried
//! into each face's location.
//!
//! Shells truck cannot convert (unsupported curve or surface types) are
//! skipped with a warning; faces truck cannot mesh come back without a
//! triangulation.

mod assembly;

pub use assembly::{resolve_instances, root_shells, ShellInstance, ROOT_TYPES};

use crate::kernel::{
    FaceTessellation, GeometryKernel, KernelError, Orientation, TessellationParams, Triangulation,
};
use crate::transform::unit_scale_matrix;
use nalgebra::Point3;
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::Path;
use stepmesh_core::{extract_length_unit_scale, is_step_exchange, EntityDecoder};
use tracing::{debug, warn};
use truck_meshalgo::prelude::*;
use truck_polymesh::PolygonMesh;
use truck_stepio::r#in::{ruststep, Table};

/// An imported STEP model: truck's entity table, the placed shells of every
/// shape root and the file length unit
pub struct StepSolid {
    table: Table,
    instances: Vec<ShellInstance>,
    unit_scale: f64,
}

impl fmt::Debug for StepSolid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSolid")
            .field("shells", &self.table.shell.len())
            .field("instances", &self.instances.len())
            .field("unit_scale", &self.unit_scale)
            .finish()
    }
}

impl StepSolid {
    /// Parse STEP content and place the shells of every shape root
    pub fn from_content(content: &str) -> Result<Self, KernelError> {
        if !is_step_exchange(content) {
            return Err(KernelError::Read(
                "not an ISO 10303-21 exchange structure".to_string(),
            ));
        }

        let exchange = ruststep::parser::parse(content)
            .map_err(|e| KernelError::Read(format!("malformed exchange structure: {}", e)))?;
        let data = exchange
            .data
            .first()
            .ok_or_else(|| KernelError::Read("no DATA section".to_string()))?;
        let table = Table::from_data_section(data);

        let mut decoder = EntityDecoder::new(content);
        let instances = resolve_instances(content, &mut decoder)
            .map_err(|e| KernelError::Read(e.to_string()))?;
        if instances.is_empty() {
            return Err(KernelError::Empty);
        }

        let unit_scale = match extract_length_unit_scale(&mut decoder) {
            Ok(scale) if scale.is_finite() && scale > 0.0 => scale,
            Ok(scale) => {
                warn!(scale, "ignoring invalid length unit, assuming millimetres");
                1.0
            }
            Err(e) => {
                warn!(error = %e, "unreadable length unit, assuming millimetres");
                1.0
            }
        };

        debug!(
            shells = table.shell.len(),
            instances = instances.len(),
            unit_scale,
            "imported STEP model"
        );

        Ok(Self {
            table,
            instances,
            unit_scale,
        })
    }

    /// Placed shells in meshing order
    pub fn instances(&self) -> &[ShellInstance] {
        &self.instances
    }

    /// Millimetres per file length unit
    pub fn unit_scale(&self) -> f64 {
        self.unit_scale
    }

    /// Mesh one shell in its own frame, or None when truck cannot convert it
    fn mesh_shell(&self, shell_id: u32, tolerance: f64) -> Option<Vec<MeshedFace>> {
        let Some(holder) = self.table.shell.get(&u64::from(shell_id)) else {
            warn!(shell = shell_id, "shell not in the B-rep table, skipping");
            return None;
        };
        let shell = match self.table.to_compressed_shell(holder) {
            Ok(shell) => shell,
            Err(e) => {
                warn!(shell = shell_id, error = ?e, "unsupported shell geometry, skipping");
                return None;
            }
        };

        let meshed = shell.robust_triangulation(tolerance);
        Some(
            meshed
                .faces
                .iter()
                .map(|face| MeshedFace {
                    same_sense: face.orientation,
                    triangulation: face.surface.as_ref().and_then(triangulation_from_polygon),
                })
                .collect(),
        )
    }
}

/// One face of a meshed shell
#[derive(Debug, Clone)]
struct MeshedFace {
    same_sense: bool,
    triangulation: Option<Triangulation>,
}

/// Geometry kernel over truck
#[derive(Debug, Clone, Copy, Default)]
pub struct StepKernel;

impl StepKernel {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryKernel for StepKernel {
    type Solid = StepSolid;

    fn import_solid(&self, path: &Path) -> Result<StepSolid, KernelError> {
        let bytes = std::fs::read(path)
            .map_err(|e| KernelError::Read(format!("{}: {}", path.display(), e)))?;
        StepSolid::from_content(&String::from_utf8_lossy(&bytes))
    }

    fn tessellate(
        &self,
        solid: &StepSolid,
        params: &TessellationParams,
    ) -> Result<Vec<FaceTessellation>, KernelError> {
        params.validate()?;

        // Deflection is millimetres; truck meshes in file units
        let tolerance = params.deflection / solid.unit_scale;
        let scale = unit_scale_matrix(solid.unit_scale);

        let mut meshed: FxHashMap<u32, Option<Vec<MeshedFace>>> = FxHashMap::default();
        let mut faces = Vec::new();

        for instance in &solid.instances {
            let shell_faces = meshed
                .entry(instance.shell)
                .or_insert_with(|| solid.mesh_shell(instance.shell, tolerance));
            let Some(shell_faces) = shell_faces else {
                continue;
            };

            let location = scale * instance.placement;
            for face in shell_faces.iter() {
                let orientation =
                    Orientation::from_same_sense(face.same_sense).flipped_if(instance.reversed);
                faces.push(match &face.triangulation {
                    Some(triangulation) => {
                        FaceTessellation::new(triangulation.clone(), orientation, location)
                    }
                    None => FaceTessellation::untriangulated(orientation),
                });
            }
        }

        debug!(
            faces = faces.len(),
            shells = meshed.len(),
            tolerance,
            "tessellated STEP model"
        );
        Ok(faces)
    }
}

/// Convert a truck face mesh into 1-based triangles. Quads are split along
/// their first diagonal; None when the mesh has no triangles.
fn triangulation_from_polygon(polygon: &PolygonMesh) -> Option<Triangulation> {
    let nodes: Vec<Point3<f64>> = polygon
        .positions()
        .iter()
        .map(|p| Point3::new(p.x, p.y, p.z))
        .collect();

    let node = |pos: usize| u32::try_from(pos + 1).ok();
    let mut triangles = Vec::new();
    for tri in polygon.tri_faces() {
        triangles.push([node(tri[0].pos)?, node(tri[1].pos)?, node(tri[2].pos)?]);
    }
    for quad in polygon.quad_faces() {
        let [a, b, c, d] = [
            node(quad[0].pos)?,
            node(quad[1].pos)?,
            node(quad[2].pos)?,
            node(quad[3].pos)?,
        ];
        triangles.push([a, b, c]);
        triangles.push([a, c, d]);
    }

    if triangles.is_empty() {
        return None;
    }
    Some(Triangulation::new(nodes, triangles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MeshExtractor;
    use approx::assert_relative_eq;

    fn step_file(data: &str) -> String {
        format!(
            "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION((''),'2;1');\nFILE_NAME('','',(''),(''),'','','');\nFILE_SCHEMA(('AUTOMOTIVE_DESIGN'));\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
            data
        )
    }

    /// Concave quad (0,4) (1,1) (4,0) (0,0) on the XY plane, area 4
    const CONCAVE_FACE: &str = "
#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=CARTESIAN_POINT('',(4.,0.,0.));
#3=CARTESIAN_POINT('',(1.,1.,0.));
#4=CARTESIAN_POINT('',(0.,4.,0.));
#5=VERTEX_POINT('',#1);
#6=VERTEX_POINT('',#2);
#7=VERTEX_POINT('',#3);
#8=VERTEX_POINT('',#4);
#9=DIRECTION('',(1.,0.,0.));
#10=VECTOR('',#9,1.);
#11=LINE('',#1,#10);
#12=EDGE_CURVE('',#5,#6,#11,.T.);
#13=DIRECTION('',(-0.948683298050514,0.316227766016838,0.));
#14=VECTOR('',#13,1.);
#15=LINE('',#2,#14);
#16=EDGE_CURVE('',#6,#7,#15,.T.);
#17=DIRECTION('',(-0.316227766016838,0.948683298050514,0.));
#18=VECTOR('',#17,1.);
#19=LINE('',#3,#18);
#20=EDGE_CURVE('',#7,#8,#19,.T.);
#21=DIRECTION('',(0.,-1.,0.));
#22=VECTOR('',#21,1.);
#23=LINE('',#4,#22);
#24=EDGE_CURVE('',#8,#5,#23,.T.);
#25=ORIENTED_EDGE('',*,*,#12,.T.);
#26=ORIENTED_EDGE('',*,*,#16,.T.);
#27=ORIENTED_EDGE('',*,*,#20,.T.);
#28=ORIENTED_EDGE('',*,*,#24,.T.);
#29=EDGE_LOOP('',(#25,#26,#27,#28));
#30=FACE_OUTER_BOUND('',#29,.T.);
#31=DIRECTION('',(0.,0.,1.));
#32=AXIS2_PLACEMENT_3D('',#1,#31,#9);
#33=PLANE('',#32);
#34=ADVANCED_FACE('',(#30),#33,.T.);
#35=CLOSED_SHELL('',(#34));
#36=MANIFOLD_SOLID_BREP('',#35);";

    fn mesh_area(result: &crate::extract::Extraction) -> f64 {
        result
            .mesh
            .positions
            .chunks_exact(9)
            .map(|t| {
                let a = Point3::new(t[0], t[1], t[2]);
                let b = Point3::new(t[3], t[4], t[5]);
                let c = Point3::new(t[6], t[7], t[8]);
                (b - a).cross(&(c - a)).norm() / 2.0
            })
            .sum()
    }

    fn mesh(data: &str) -> crate::extract::Extraction {
        let solid = StepSolid::from_content(&step_file(data)).unwrap();
        let faces = StepKernel
            .tessellate(&solid, &TessellationParams::default())
            .unwrap();
        MeshExtractor::extract(&faces, 1.0).unwrap()
    }

    #[test]
    fn test_rejects_non_step_content() {
        let err = StepSolid::from_content("solid cube\nendsolid").unwrap_err();
        assert!(matches!(err, KernelError::Read(_)));
    }

    #[test]
    fn test_no_roots_is_empty() {
        let err = StepSolid::from_content(&step_file("#1=CARTESIAN_POINT('',(0.,0.,0.));"))
            .unwrap_err();
        assert!(matches!(err, KernelError::Empty));
    }

    #[test]
    fn test_concave_face_stays_inside_its_boundary() {
        let result = mesh(CONCAVE_FACE);
        assert_eq!(result.face_count, 1);
        assert_relative_eq!(mesh_area(&result), 4.0, epsilon = 1e-6);

        // No triangle covers the notch around (2, 2)
        for t in result.mesh.positions.chunks_exact(9) {
            let centroid_x = (t[0] + t[3] + t[6]) / 3.0;
            let centroid_y = (t[1] + t[4] + t[7]) / 3.0;
            assert!(centroid_x + 3.0 * centroid_y <= 4.0 + 1e-9 || 3.0 * centroid_x + centroid_y <= 4.0 + 1e-9);
        }
        for n in result.mesh.normals.chunks_exact(3) {
            assert_relative_eq!(n[2], 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_metre_file_is_scaled_to_millimetres() {
        let data = format!(
            "{}\n#40=(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT($,.METRE.));",
            CONCAVE_FACE
        );
        let solid = StepSolid::from_content(&step_file(&data)).unwrap();
        assert_relative_eq!(solid.unit_scale(), 1000.0);

        let result = mesh(&data);
        assert_relative_eq!(result.bounds.max.x, 4000.0, epsilon = 1e-6);
        assert_relative_eq!(mesh_area(&result), 4.0e6, epsilon = 1e-3);
    }

    #[test]
    fn test_reversed_shell_flips_normals() {
        let data = CONCAVE_FACE.replace(
            "#36=MANIFOLD_SOLID_BREP('',#35);",
            "#36=ORIENTED_CLOSED_SHELL('',*,#35,.F.);\n#37=SHELL_BASED_SURFACE_MODEL('',(#36));",
        );
        let result = mesh(&data);
        for n in result.mesh.normals.chunks_exact(3) {
            assert_relative_eq!(n[2], -1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_unconvertible_shell_is_skipped() {
        let data = CONCAVE_FACE.replace("#34=ADVANCED_FACE('',(#30),#33,.T.);", "#34=ADVANCED_FACE('',(#30),#99,.T.);");
        let solid = StepSolid::from_content(&step_file(&data)).unwrap();
        let faces = StepKernel
            .tessellate(&solid, &TessellationParams::default())
            .unwrap();
        assert!(faces.iter().all(|f| f.triangulation.is_none()));
    }

    #[test]
    fn test_invalid_params() {
        let solid = StepSolid::from_content(&step_file(CONCAVE_FACE)).unwrap();
        let err = StepKernel
            .tessellate(&solid, &TessellationParams::new(-0.1, 0.5))
            .unwrap_err();
        assert!(matches!(err, KernelError::Tessellation(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = StepKernel
            .import_solid(Path::new("/nonexistent/part.step"))
            .unwrap_err();
        assert!(matches!(err, KernelError::Read(_)));
    }
}
