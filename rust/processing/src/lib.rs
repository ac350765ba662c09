// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP Mesh Processing
//!
//! The export pipeline shared by the command line tool: configuration,
//! kernel-driven extraction and the streaming JSON document.
//!
//! ```no_run
//! use stepmesh_geometry::StepKernel;
//! use stepmesh_processing::{export_mesh, ExportConfig};
//!
//! let config = ExportConfig::from_env("part.step");
//! let summary = export_mesh(&StepKernel, &config, std::io::stdout().lock())?;
//! eprintln!("{} triangles", summary.triangle_count);
//! # Ok::<(), stepmesh_processing::ExportError>(())
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod export;

pub use config::ExportConfig;
pub use document::{write_document, MeshDocument, MESH_ID};
pub use error::{ExportError, Result};
pub use export::{export_mesh, ExportSummary};
