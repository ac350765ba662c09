// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! stepmesh-export - STEP B-rep to JSON mesh export.
//!
//! ```text
//! stepmesh-export <file.step> [--deflection 0.2] [--angle 0.5] [--unit mm]
//! ```
//!
//! Flags override `STEPMESH_DEFLECTION`, `STEPMESH_ANGLE` and
//! `STEPMESH_UNIT`, which override the defaults shown. The mesh document
//! goes to stdout; diagnostics and logs go to stderr.
//! Exit status is 0 on success and 1 on any failure.

use std::io;
use std::process::ExitCode;
use stepmesh_geometry::StepKernel;
use stepmesh_processing::{export_mesh, ExportConfig};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: stepmesh-export <file.step> [--deflection 0.2] [--angle 0.5] [--unit mm]

Flags override STEPMESH_DEFLECTION, STEPMESH_ANGLE and STEPMESH_UNIT,
which override the defaults shown.";

fn main() -> ExitCode {
    // Initialize logging; stdout is reserved for the document and stderr
    // carries only the diagnostic unless RUST_LOG asks for more
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(io::stderr)
        .init();

    let Some(config) = ExportConfig::from_args(std::env::args().skip(1)) else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };

    let stdout = io::stdout();
    let writer = io::BufWriter::new(stdout.lock());

    match export_mesh(&StepKernel::new(), &config, writer) {
        Ok(summary) => {
            tracing::debug!(triangles = summary.triangle_count, "document written");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!(error = ?e, "export failed");
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
