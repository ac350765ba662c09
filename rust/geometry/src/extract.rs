// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face tessellation extractor
//!
//! Walks kernel faces in order and expands every triangle into three
//! non-shared vertices carrying one flat normal. Winding is kept as the
//! kernel produced it; reversed faces only get their normal negated.

use crate::bounds::Bounds;
use crate::error::{Error, Result};
use crate::kernel::FaceTessellation;
use crate::math::triangle_normal;
use crate::mesh::MeshBuffer;
use nalgebra::Point3;
use tracing::debug;

/// Output of one extraction pass
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub mesh: MeshBuffer,
    pub bounds: Bounds,
    /// Faces that contributed triangles
    pub face_count: usize,
    /// Faces without a triangulation
    pub skipped_faces: usize,
}

/// Single-pass accumulator over kernel faces
#[derive(Debug)]
pub struct MeshExtractor {
    scale: f64,
    mesh: MeshBuffer,
    bounds: Bounds,
    face_count: usize,
    skipped_faces: usize,
}

impl MeshExtractor {
    /// `scale` multiplies every model-space coordinate
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            mesh: MeshBuffer::new(),
            bounds: Bounds::new(),
            face_count: 0,
            skipped_faces: 0,
        }
    }

    /// Extract all faces in kernel order
    pub fn extract(faces: &[FaceTessellation], scale: f64) -> Result<Extraction> {
        let triangles = faces
            .iter()
            .filter_map(|f| f.triangulation.as_ref())
            .map(|t| t.triangles.len())
            .sum();

        let mut extractor = Self::new(scale);
        extractor.mesh = MeshBuffer::with_triangle_capacity(triangles);
        for (index, face) in faces.iter().enumerate() {
            extractor.add_face(face).map_err(|e| {
                debug!(face = index, error = %e, "face extraction failed");
                e
            })?;
        }
        Ok(extractor.finish())
    }

    /// Append one face's triangles
    pub fn add_face(&mut self, face: &FaceTessellation) -> Result<()> {
        let triangulation = match &face.triangulation {
            Some(t) if !t.is_empty() => t,
            _ => {
                debug!("skipping face without triangulation");
                self.skipped_faces += 1;
                return Ok(());
            }
        };

        let location = &face.location;
        let reversed = face.orientation.is_reversed();
        let nodes = &triangulation.nodes;
        let scale = self.scale;

        let vertex = |index: u32| -> Result<Point3<f64>> {
            let node = index
                .checked_sub(1)
                .and_then(|i| nodes.get(i as usize))
                .ok_or(Error::InvalidNodeIndex {
                    index,
                    node_count: nodes.len(),
                })?;
            let p = location.transform_point(node);
            Ok(p * scale)
        };

        for &[i1, i2, i3] in &triangulation.triangles {
            let v1 = vertex(i1)?;
            let v2 = vertex(i2)?;
            let v3 = vertex(i3)?;

            let mut normal = triangle_normal(&v1, &v2, &v3);
            if reversed {
                normal = -normal;
            }

            self.mesh.append_triangle(&[v1, v2, v3], &normal)?;
            self.bounds.update(&v1);
            self.bounds.update(&v2);
            self.bounds.update(&v3);
        }

        self.face_count += 1;
        Ok(())
    }

    /// Triangles collected so far
    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    pub fn finish(self) -> Extraction {
        Extraction {
            mesh: self.mesh,
            bounds: self.bounds,
            face_count: self.face_count,
            skipped_faces: self.skipped_faces,
        }
    }
}
