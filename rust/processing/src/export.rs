// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Import, tessellate, extract and serialize in one pass.

use crate::config::ExportConfig;
use crate::document::write_document;
use crate::error::{ExportError, Result};
use std::io::Write;
use std::time::{Duration, Instant};
use stepmesh_geometry::{Bounds, GeometryKernel, MeshExtractor};
use tracing::{debug, info};

/// Statistics of a completed export. Logged, never written to the document.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Faces that produced triangles
    pub face_count: usize,
    /// Faces the kernel left without a triangulation
    pub skipped_faces: usize,
    pub triangle_count: usize,
    pub vertex_count: usize,
    pub bounds: Bounds,
    pub elapsed: Duration,
}

/// Export the configured STEP file as a mesh document into `writer`.
///
/// Nothing is written unless at least one triangle was extracted.
pub fn export_mesh<K, W>(kernel: &K, config: &ExportConfig, mut writer: W) -> Result<ExportSummary>
where
    K: GeometryKernel,
    W: Write,
{
    let start = Instant::now();
    let unit = config.output_unit();
    info!(
        input = %config.input.display(),
        deflection = config.deflection,
        angle = config.angle,
        unit = %unit,
        "exporting mesh"
    );

    let solid = kernel
        .import_solid(&config.input)
        .map_err(|e| {
            debug!(error = %e, "import failed");
            ExportError::from_import(e)
        })?;
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "model imported");

    let faces = kernel
        .tessellate(&solid, &config.tessellation_params())
        .map_err(|e| {
            debug!(error = %e, "tessellation failed");
            ExportError::from(e)
        })?;
    debug!(faces = faces.len(), "model tessellated");

    let extraction = MeshExtractor::extract(&faces, unit.scale()).map_err(|e| {
        debug!(error = %e, "extraction failed");
        ExportError::from(e)
    })?;
    drop(faces);
    drop(solid);

    write_document(&mut writer, &extraction.mesh, &extraction.bounds).map_err(|e| {
        debug!(error = ?e, "document not written");
        e
    })?;
    writer.flush()?;

    let summary = ExportSummary {
        face_count: extraction.face_count,
        skipped_faces: extraction.skipped_faces,
        triangle_count: extraction.mesh.triangle_count(),
        vertex_count: extraction.mesh.vertex_count(),
        bounds: extraction.bounds,
        elapsed: start.elapsed(),
    };

    info!(
        faces = summary.face_count,
        skipped_faces = summary.skipped_faces,
        triangles = summary.triangle_count,
        vertices = summary.vertex_count,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "export complete"
    );

    Ok(summary)
}
