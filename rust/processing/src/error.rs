// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Export failures. Every variant maps to exit status 1.

use stepmesh_geometry::KernelError;
use thiserror::Error;

/// Result type for the export pipeline
pub type Result<T> = std::result::Result<T, ExportError>;

/// Export pipeline errors. Display text is what the CLI prints.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to read STEP file.")]
    InputRead(#[source] KernelError),

    #[error("STEP file has no shapes.")]
    EmptyModel(#[source] KernelError),

    #[error("Meshing failed.")]
    Tessellation(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("No mesh data extracted.")]
    EmptyMesh,

    #[error("Failed to write mesh document: {0}")]
    Io(#[source] std::io::Error),
}

impl ExportError {
    /// Classify an import failure
    pub fn from_import(err: KernelError) -> Self {
        match err {
            KernelError::Empty => ExportError::EmptyModel(err),
            _ => ExportError::InputRead(err),
        }
    }

    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        1
    }
}

impl From<KernelError> for ExportError {
    fn from(err: KernelError) -> Self {
        ExportError::Tessellation(Box::new(err))
    }
}

impl From<stepmesh_geometry::Error> for ExportError {
    fn from(err: stepmesh_geometry::Error) -> Self {
        ExportError::Tessellation(Box::new(err))
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Io(err.into())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages() {
        assert_eq!(
            ExportError::from_import(KernelError::Read("x".into())).to_string(),
            "Failed to read STEP file."
        );
        assert_eq!(
            ExportError::from_import(KernelError::Empty).to_string(),
            "STEP file has no shapes."
        );
        assert_eq!(
            ExportError::from(KernelError::Tessellation("x".into())).to_string(),
            "Meshing failed."
        );
        assert_eq!(ExportError::EmptyMesh.to_string(), "No mesh data extracted.");
        assert!(ExportError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            .to_string()
            .starts_with("Failed to write mesh document: "));
    }

    #[test]
    fn test_source_is_kept() {
        let err = ExportError::from(stepmesh_geometry::Error::InvalidNodeIndex {
            index: 0,
            node_count: 3,
        });
        assert!(err.source().is_some());
        assert!(ExportError::EmptyMesh.source().is_none());
        assert_eq!(err.exit_code(), 1);
    }
}
