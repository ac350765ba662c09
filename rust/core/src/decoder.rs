// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Decoder - On-demand entity parsing
//!
//! Lazily decode STEP entities from byte offsets without tokenizing the
//! whole data section up front.

use crate::entity::DecodedEntity;
use crate::error::{Error, Result};
use crate::parser::{data_section_start, parse_entity, record_end};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Pre-built entity index type
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Build entity index from content - O(n) scan using SIMD-accelerated search
/// Returns index mapping entity IDs to byte offsets of their records
#[inline]
pub fn build_entity_index(content: &str) -> EntityIndex {
    let bytes = content.as_bytes();
    let len = bytes.len();

    // Pre-allocate with estimated capacity (roughly 1 entity per 50 bytes)
    let estimated_entities = len / 50;
    let mut index = FxHashMap::with_capacity_and_hasher(estimated_entities, Default::default());

    let mut pos = data_section_start(content);

    while pos < len {
        let hash_offset = match memchr::memchr(b'#', &bytes[pos..]) {
            Some(offset) => offset,
            None => break,
        };

        let start = pos + hash_offset;
        pos = start + 1;

        let id_start = pos;
        while pos < len && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let id_end = pos;

        // Handles both `#45=` and `#45 = `
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        if id_end > id_start && pos < len && bytes[pos] == b'=' {
            let id = parse_u32_inline(bytes, id_start, id_end);

            match record_end(bytes, pos) {
                Some(end) => {
                    index.insert(id, (start, end));
                    pos = end;
                }
                None => break, // No terminating semicolon, malformed tail
            }
        }
    }

    index
}

/// Fast u32 parsing without string allocation
#[inline]
fn parse_u32_inline(bytes: &[u8], start: usize, end: usize) -> u32 {
    let mut result: u32 = 0;
    for &byte in &bytes[start..end] {
        let digit = byte.wrapping_sub(b'0');
        result = result.wrapping_mul(10).wrapping_add(digit as u32);
    }
    result
}

/// Entity decoder for lazy parsing - uses Arc for efficient cache sharing
pub struct EntityDecoder<'a> {
    content: &'a str,
    /// Cache of decoded entities (entity_id -> `Arc<DecodedEntity>`)
    cache: FxHashMap<u32, Arc<DecodedEntity>>,
    /// Index of entity offsets (entity_id -> (start, end)), built lazily
    entity_index: Option<Arc<EntityIndex>>,
    /// Cache of cartesian point coordinates for the fast path
    point_cache: FxHashMap<u32, (f64, f64, f64)>,
}

impl<'a> EntityDecoder<'a> {
    /// Create new decoder
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            cache: FxHashMap::default(),
            entity_index: None,
            point_cache: FxHashMap::default(),
        }
    }

    /// The underlying file content
    #[inline]
    pub fn content(&self) -> &'a str {
        self.content
    }

    fn build_index(&mut self) {
        if self.entity_index.is_some() {
            return;
        }
        self.entity_index = Some(Arc::new(build_entity_index(self.content)));
    }

    /// Decode the record at a byte offset, sharing the cached copy if any
    #[inline]
    fn decode_at(&mut self, start: usize, end: usize) -> Result<DecodedEntity> {
        let line = &self.content[start..end];
        let (id, record) = parse_entity(line).map_err(|e| {
            Error::parse(
                start,
                format!("{}, input: {:?}", e, &line[..line.len().min(100)]),
            )
        })?;

        if let Some(entity_arc) = self.cache.get(&id) {
            return Ok(entity_arc.as_ref().clone());
        }

        let entity = DecodedEntity::from_record(id, &record);
        self.cache.insert(id, Arc::new(entity.clone()));
        Ok(entity)
    }

    /// Decode entity by ID - O(1) lookup using entity index
    #[inline]
    pub fn decode_by_id(&mut self, entity_id: u32) -> Result<DecodedEntity> {
        if let Some(entity_arc) = self.cache.get(&entity_id) {
            return Ok(entity_arc.as_ref().clone());
        }

        self.build_index();

        let (start, end) = self
            .entity_index
            .as_ref()
            .and_then(|idx| idx.get(&entity_id).copied())
            .ok_or(Error::EntityNotFound(entity_id))?;

        self.decode_at(start, end)
    }

    /// Get raw content string for an entity
    #[inline]
    pub fn get_raw_content(&mut self, entity_id: u32) -> Option<&'a str> {
        self.build_index();
        let (start, end) = self.entity_index.as_ref()?.get(&entity_id).copied()?;
        Some(&self.content[start..end])
    }

    /// Fast extraction of CARTESIAN_POINT coordinates from raw bytes
    /// Bypasses token decoding; results are cached because B-rep vertices
    /// are shared between many edges.
    #[inline]
    pub fn get_cartesian_point_fast(&mut self, entity_id: u32) -> Option<(f64, f64, f64)> {
        if let Some(point) = self.point_cache.get(&entity_id) {
            return Some(*point);
        }

        let raw = self.get_raw_content(entity_id)?;
        let point = parse_cartesian_point_inline(raw.as_bytes())?;
        self.point_cache.insert(entity_id, point);
        Some(point)
    }
}

/// Parse `#n=CARTESIAN_POINT('name',(x,y,z));` without allocation.
/// Returns None for anything else so callers fall back to full decoding.
fn parse_cartesian_point_inline(bytes: &[u8]) -> Option<(f64, f64, f64)> {
    let len = bytes.len();
    let eq = memchr::memchr(b'=', bytes)?;
    let open = eq + memchr::memchr(b'(', &bytes[eq..])?;

    let type_name = std::str::from_utf8(&bytes[eq + 1..open]).ok()?.trim();
    if !type_name.eq_ignore_ascii_case("CARTESIAN_POINT") {
        return None;
    }

    let mut i = open + 1;
    while i < len && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    // Skip the name string; doubled quotes re-enter the loop
    if i < len && bytes[i] == b'\'' {
        i += 1;
        loop {
            let close = i + memchr::memchr(b'\'', &bytes[i..])?;
            i = close + 1;
            if i < len && bytes[i] == b'\'' {
                i += 1;
                continue;
            }
            break;
        }
    }

    i += memchr::memchr(b'(', &bytes[i..])? + 1;

    let mut offset = i;
    let x = parse_next_float(bytes, &mut offset)?;
    let y = parse_next_float(bytes, &mut offset)?;
    let z = parse_next_float(bytes, &mut offset).unwrap_or(0.0);
    Some((x, y, z))
}

/// Parse the next float after optional whitespace/commas, advancing `offset`
#[inline]
fn parse_next_float(bytes: &[u8], offset: &mut usize) -> Option<f64> {
    let len = bytes.len();
    let mut i = *offset;

    while i < len && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
        i += 1;
    }

    if i >= len || bytes[i] == b')' {
        return None;
    }

    match fast_float::parse_partial::<f64, _>(&bytes[i..]) {
        Ok((value, consumed)) if consumed > 0 => {
            *offset = i + consumed;
            Some(value)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = r#"ISO-10303-21;
HEADER;
FILE_NAME('part.step','2024-01-01T00:00:00',('#99=nothing;'),(''),'','','');
ENDSEC;
DATA;
#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=DIRECTION('',(0.,0.,1.));
#3=DIRECTION('',(1.,0.,0.));
#4=AXIS2_PLACEMENT_3D('',#1,#2,#3);
#5 = PLANE('base;plane',#4);
#6=CARTESIAN_POINT('it''s',(1.5E1,-2.,3.25));
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_index_skips_header_and_quoted_semicolons() {
        let index = build_entity_index(CONTENT);
        assert_eq!(index.len(), 6);
        assert!(!index.contains_key(&99));

        let (start, end) = index[&5];
        assert_eq!(&CONTENT[start..end], "#5 = PLANE('base;plane',#4);");
    }

    #[test]
    fn test_decode_by_id() {
        let mut decoder = EntityDecoder::new(CONTENT);
        let placement = decoder.decode_by_id(4).unwrap();
        assert_eq!(placement.type_name, "AXIS2_PLACEMENT_3D");
        assert_eq!(placement.get_ref(1), Some(1));
        assert_eq!(placement.get_ref(3), Some(3));
    }

    #[test]
    fn test_missing_entity() {
        let mut decoder = EntityDecoder::new(CONTENT);
        assert_eq!(decoder.decode_by_id(42).unwrap_err(), Error::EntityNotFound(42));
    }

    #[test]
    fn test_cache() {
        let mut decoder = EntityDecoder::new(CONTENT);
        assert!(decoder.cache.is_empty());
        let first = decoder.decode_by_id(1).unwrap();
        let second = decoder.decode_by_id(1).unwrap();
        assert_eq!(first, second);
        assert_eq!(decoder.cache.len(), 1);
    }

    #[test]
    fn test_cartesian_point_fast_path() {
        let mut decoder = EntityDecoder::new(CONTENT);
        assert_eq!(decoder.get_cartesian_point_fast(6), Some((15.0, -2.0, 3.25)));
        assert_eq!(decoder.get_cartesian_point_fast(1), Some((0.0, 0.0, 0.0)));
        // Not a point
        assert_eq!(decoder.get_cartesian_point_fast(2), None);
    }
}
