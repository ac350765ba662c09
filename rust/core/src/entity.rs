// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded STEP entities
//!
//! Owned attribute values produced from parser tokens. Geometry code reads
//! these through the typed accessors instead of matching tokens directly.

use crate::error::{Error, Result};
use crate::parser::{Record, RecordPart, Token};

/// STEP entity attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Entity reference
    EntityRef(u32),
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enum value (without the surrounding dots)
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Typed value such as LENGTH_MEASURE(25.4)
    Typed(String, Vec<AttributeValue>),
    /// Null/undefined
    Null,
    /// Derived value (*)
    Derived,
}

impl AttributeValue {
    /// Convert from Token
    pub fn from_token(token: &Token) -> Self {
        match token {
            Token::EntityRef(id) => AttributeValue::EntityRef(*id),
            Token::String(s) => AttributeValue::String(s.to_string()),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(e) => AttributeValue::Enum(e.to_string()),
            Token::List(items) => {
                AttributeValue::List(items.iter().map(Self::from_token).collect())
            }
            Token::TypedValue(type_name, args) => AttributeValue::Typed(
                type_name.to_string(),
                args.iter().map(Self::from_token).collect(),
            ),
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }

    /// Get as entity reference
    #[inline]
    pub fn as_entity_ref(&self) -> Option<u32> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as enum value (strips the dots from .ENUM.)
    #[inline]
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Get as STEP logical: .T. / .F.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_enum()? {
            "T" | "TRUE" => Some(true),
            "F" | "FALSE" => Some(false),
            _ => None,
        }
    }

    /// Get as float. Integers widen, single-argument typed values unwrap.
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Typed(_, args) if args.len() == 1 => args[0].as_float(),
            _ => None,
        }
    }

    /// Get as list
    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Parse a coordinate triple list such as (1.,2.,3.).
    /// Missing components default to 0 so 2D points lift onto z = 0.
    pub fn as_coordinates(&self) -> Option<(f64, f64, f64)> {
        let coords = self.as_list()?;
        let x = coords.first()?.as_float()?;
        let y = coords.get(1).and_then(|v| v.as_float()).unwrap_or(0.0);
        let z = coords.get(2).and_then(|v| v.as_float()).unwrap_or(0.0);
        Some((x, y, z))
    }

}

/// One partial type of a complex instance, e.g. `SI_UNIT(.MILLI.,.METRE.)`
#[derive(Debug, Clone, PartialEq)]
pub struct PartialEntity {
    pub type_name: String,
    pub attributes: Vec<AttributeValue>,
}

impl PartialEntity {
    fn from_part(part: &RecordPart) -> Self {
        Self {
            type_name: part.type_name.to_ascii_uppercase(),
            attributes: part.args.iter().map(AttributeValue::from_token).collect(),
        }
    }

    /// Get attribute by index
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }
}

/// Decoded STEP entity with attributes
///
/// Simple instances carry their attributes directly. Complex instances keep
/// every partial type in `partials`; `type_name` is the first partial and
/// `attributes` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    pub id: u32,
    pub type_name: String,
    pub attributes: Vec<AttributeValue>,
    pub partials: Vec<PartialEntity>,
}

impl DecodedEntity {
    /// Create new simple entity
    pub fn new(id: u32, type_name: impl Into<String>, attributes: Vec<AttributeValue>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            attributes,
            partials: Vec::new(),
        }
    }

    /// Build from a parsed record
    pub fn from_record(id: u32, record: &Record) -> Self {
        match record {
            Record::Simple(part) => {
                let partial = PartialEntity::from_part(part);
                Self::new(id, partial.type_name, partial.attributes)
            }
            Record::Complex(parts) => {
                let partials: Vec<PartialEntity> =
                    parts.iter().map(PartialEntity::from_part).collect();
                Self {
                    id,
                    type_name: partials
                        .first()
                        .map(|p| p.type_name.clone())
                        .unwrap_or_default(),
                    attributes: Vec::new(),
                    partials,
                }
            }
        }
    }

    /// True for complex (multi-partial) instances
    #[inline]
    pub fn is_complex(&self) -> bool {
        !self.partials.is_empty()
    }

    /// True when the entity is, or contains a partial of, the given type
    pub fn is_a(&self, type_name: &str) -> bool {
        self.type_name.eq_ignore_ascii_case(type_name)
            || self
                .partials
                .iter()
                .any(|p| p.type_name.eq_ignore_ascii_case(type_name))
    }

    /// Look up a partial type of a complex instance
    pub fn partial(&self, type_name: &str) -> Option<&PartialEntity> {
        self.partials
            .iter()
            .find(|p| p.type_name.eq_ignore_ascii_case(type_name))
    }

    /// Get attribute by index
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    /// Get entity reference attribute
    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(|v| v.as_entity_ref())
    }

    /// Get float attribute
    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|v| v.as_float())
    }

    /// Get list attribute
    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index).and_then(|v| v.as_list())
    }

    /// Get logical attribute
    pub fn get_bool(&self, index: usize) -> Option<bool> {
        self.get(index).and_then(|v| v.as_bool())
    }

    /// Required entity reference, with a descriptive error
    pub fn require_ref(&self, index: usize, what: &str) -> Result<u32> {
        self.get_ref(index)
            .ok_or_else(|| Error::attribute(self.id, &self.type_name, format!("missing {}", what)))
    }

    /// Required list, with a descriptive error
    pub fn require_list(&self, index: usize, what: &str) -> Result<&[AttributeValue]> {
        self.get_list(index)
            .ok_or_else(|| Error::attribute(self.id, &self.type_name, format!("missing {}", what)))
    }
}
