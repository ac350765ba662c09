// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # StepMesh Core Parser
//!
//! STEP (ISO 10303-21) parser built with [nom](https://docs.rs/nom).
//! Provides zero-copy tokenization, fast entity scanning and lazy decoding
//! for B-rep exchange files.
//!
//! ## Overview
//!
//! - **Tokenization**: simple and complex entity instances, typed values, comments
//! - **Entity Scanning**: SIMD-accelerated record discovery using [memchr](https://docs.rs/memchr)
//! - **Lazy Decoding**: on-demand attribute parsing with an id → offset index
//! - **Units**: model length unit resolved to millimetres per file unit
//!
//! ## Quick Start
//!
//! ```rust
//! use stepmesh_core::{EntityDecoder, EntityScanner};
//!
//! let content = "DATA;\n#1=CARTESIAN_POINT('',(1.,2.,3.));\n#2=VERTEX_POINT('',#1);\nENDSEC;";
//!
//! let mut scanner = EntityScanner::new(content);
//! let (id, type_name, _, _) = scanner.next_entity().unwrap();
//! assert_eq!((id, type_name), (1, "CARTESIAN_POINT"));
//!
//! let mut decoder = EntityDecoder::new(content);
//! let vertex = decoder.decode_by_id(2).unwrap();
//! assert_eq!(vertex.get_ref(1), Some(1));
//! assert_eq!(decoder.get_cartesian_point_fast(1), Some((1.0, 2.0, 3.0)));
//! ```

pub mod decoder;
pub mod entity;
pub mod error;
pub mod parser;
pub mod units;

pub use decoder::{build_entity_index, EntityDecoder, EntityIndex};
pub use entity::{AttributeValue, DecodedEntity, PartialEntity};
pub use error::{Error, Result};
pub use parser::{
    data_section_start, is_step_exchange, parse_entity, EntityScanner, Record, RecordPart, Token,
};
pub use units::{extract_length_unit_scale, get_si_prefix_multiplier};
