// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for STEP parsing and decoding

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while tokenizing or decoding STEP content
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Entity #{0} not found")]
    EntityNotFound(u32),

    #[error("Entity #{id} ({type_name}): {message}")]
    InvalidAttribute {
        id: u32,
        type_name: String,
        message: String,
    },

    #[error("Not an ISO 10303-21 exchange structure")]
    NotStepFile,
}

impl Error {
    /// Create a parse error at the given byte offset
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create an attribute error for a decoded entity
    pub fn attribute(id: u32, type_name: &str, message: impl Into<String>) -> Self {
        Error::InvalidAttribute {
            id,
            type_name: type_name.to_string(),
            message: message.into(),
        }
    }
}
