// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh document serialization.
//!
//! ```text
//! {"bounds":{"min":[x,y,z],"max":[x,y,z]},
//!  "meshes":[{"id":"mesh-0","positions":[..],"normals":[..],"indices":[..]}],
//!  "edges":[]}
//! ```
//!
//! The document borrows the mesh buffers and is streamed straight into the
//! writer.

use crate::error::{ExportError, Result};
use serde::Serialize;
use std::io::Write;
use stepmesh_geometry::{Bounds, MeshBuffer};

/// Id of the single mesh entry.
pub const MESH_ID: &str = "mesh-0";

/// Serialized bounding box.
#[derive(Debug, Serialize)]
pub struct BoundsData {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl From<&Bounds> for BoundsData {
    fn from(bounds: &Bounds) -> Self {
        Self {
            min: [bounds.min.x, bounds.min.y, bounds.min.z],
            max: [bounds.max.x, bounds.max.y, bounds.max.z],
        }
    }
}

/// One mesh entry, borrowing the buffer.
#[derive(Debug, Serialize)]
pub struct MeshEntry<'a> {
    pub id: &'a str,
    pub positions: &'a [f64],
    pub normals: &'a [f64],
    pub indices: &'a [u32],
}

/// Edge polyline entry. Edges are never exported, the list stays empty.
#[derive(Debug, Serialize)]
pub struct EdgeEntry {
    pub positions: Vec<f64>,
}

/// Top-level document.
#[derive(Debug, Serialize)]
pub struct MeshDocument<'a> {
    pub bounds: BoundsData,
    pub meshes: [MeshEntry<'a>; 1],
    pub edges: Vec<EdgeEntry>,
}

impl<'a> MeshDocument<'a> {
    pub fn new(mesh: &'a MeshBuffer, bounds: &Bounds) -> Self {
        Self {
            bounds: bounds.into(),
            meshes: [MeshEntry {
                id: MESH_ID,
                positions: &mesh.positions,
                normals: &mesh.normals,
                indices: &mesh.indices,
            }],
            edges: Vec::new(),
        }
    }
}

/// Stream the document into `writer`.
///
/// Empty bounds mean nothing was extracted and are rejected with
/// [`ExportError::EmptyMesh`] before any byte is written.
pub fn write_document<W: Write>(writer: W, mesh: &MeshBuffer, bounds: &Bounds) -> Result<()> {
    if bounds.is_empty() || mesh.is_empty() {
        return Err(ExportError::EmptyMesh);
    }
    serde_json::to_writer(writer, &MeshDocument::new(mesh, bounds))?;
    Ok(())
}
