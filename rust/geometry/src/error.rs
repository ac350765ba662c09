use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Triangle references node {index} but the face has {node_count} nodes")]
    InvalidNodeIndex { index: u32, node_count: usize },

    #[error("Mesh vertex {count} does not fit a 32-bit index")]
    IndexOverflow { count: usize },

    #[error("Core parser error: {0}")]
    CoreError(#[from] stepmesh_core::Error),
}

impl Error {
    /// Create a geometry error
    pub fn geometry(message: impl Into<String>) -> Self {
        Error::Geometry(message.into())
    }
}
