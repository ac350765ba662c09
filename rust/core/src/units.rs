// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Length unit extraction for STEP files
//!
//! STEP declares its units as complex instances such as
//! `(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.))` or, for
//! imperial files, `(CONVERSION_BASED_UNIT('INCH',#m) LENGTH_UNIT() NAMED_UNIT(#d))`.
//! Geometry code works in millimetres, so the resolved factor is expressed
//! as millimetres per file unit.

use crate::decoder::EntityDecoder;
use crate::entity::DecodedEntity;
use crate::error::Result;

/// Millimetres in one metre
const MM_PER_METRE: f64 = 1000.0;

/// Guard against cyclic conversion chains
const MAX_CONVERSION_DEPTH: usize = 8;

/// SI prefix multipliers as named by the `si_prefix` enumeration
#[inline]
pub fn get_si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "ATTO" => 1e-18,
        "FEMTO" => 1e-15,
        "PICO" => 1e-12,
        "NANO" => 1e-9,
        "MICRO" => 1e-6,
        "MILLI" => 1e-3,
        "CENTI" => 1e-2,
        "DECI" => 1e-1,
        "DECA" => 1e1,
        "HECTO" => 1e2,
        "KILO" => 1e3,
        "MEGA" => 1e6,
        "GIGA" => 1e9,
        "TERA" => 1e12,
        "PETA" => 1e15,
        "EXA" => 1e18,
        _ => 1.0,
    }
}

/// Extract the model length unit as millimetres per file unit
///
/// Prefers the length unit listed by `GLOBAL_UNIT_ASSIGNED_CONTEXT`, then
/// falls back to the first `LENGTH_UNIT` instance in the data section.
/// Files without any unit declaration are treated as millimetres.
pub fn extract_length_unit_scale(decoder: &mut EntityDecoder) -> Result<f64> {
    let Some(unit) = find_model_length_unit(decoder)? else {
        return Ok(1.0);
    };
    length_unit_in_metres(decoder, &unit, 0).map(|m| m * MM_PER_METRE)
}

fn find_model_length_unit(decoder: &mut EntityDecoder) -> Result<Option<DecodedEntity>> {
    let content = decoder.content();
    let bytes = content.as_bytes();
    let context_finder = memchr::memmem::Finder::new("GLOBAL_UNIT_ASSIGNED_CONTEXT");
    let unit_finder = memchr::memmem::Finder::new("LENGTH_UNIT");

    let mut scanner = crate::parser::EntityScanner::new(content);
    let mut fallback = None;

    while let Some((id, _, start, end)) = scanner.next_entity() {
        let raw = &bytes[start..end];

        if context_finder.find(raw).is_some() {
            let context = decoder.decode_by_id(id)?;
            let units = context
                .partial("GLOBAL_UNIT_ASSIGNED_CONTEXT")
                .and_then(|p| p.get(0))
                .and_then(|v| v.as_list())
                .map(|items| items.to_vec())
                .unwrap_or_default();

            for unit_ref in units.iter().filter_map(|v| v.as_entity_ref()) {
                let unit = decoder.decode_by_id(unit_ref)?;
                if unit.is_a("LENGTH_UNIT") {
                    return Ok(Some(unit));
                }
            }
        } else if fallback.is_none() && unit_finder.find(raw).is_some() {
            let unit = decoder.decode_by_id(id)?;
            if unit.is_a("LENGTH_UNIT") {
                fallback = Some(unit);
            }
        }
    }

    Ok(fallback)
}

/// Size of one unit in metres
fn length_unit_in_metres(
    decoder: &mut EntityDecoder,
    unit: &DecodedEntity,
    depth: usize,
) -> Result<f64> {
    if depth > MAX_CONVERSION_DEPTH {
        return Ok(1.0);
    }

    if let Some(si) = unit.partial("SI_UNIT") {
        let prefix = si.get(0).and_then(|v| v.as_enum()).unwrap_or("");
        return Ok(get_si_prefix_multiplier(prefix));
    }

    if let Some(conversion) = unit.partial("CONVERSION_BASED_UNIT") {
        // CONVERSION_BASED_UNIT(name, conversion_factor)
        let Some(factor_id) = conversion.get(1).and_then(|v| v.as_entity_ref()) else {
            return Ok(1.0);
        };
        let measure = decoder.decode_by_id(factor_id)?;
        return measure_in_metres(decoder, &measure, depth);
    }

    Ok(1.0)
}

/// Resolve a `LENGTH_MEASURE_WITH_UNIT(value, unit)` to metres
fn measure_in_metres(
    decoder: &mut EntityDecoder,
    measure: &DecodedEntity,
    depth: usize,
) -> Result<f64> {
    let (value, unit_ref) = match measure.partial("LENGTH_MEASURE_WITH_UNIT") {
        // Complex form: (LENGTH_MEASURE_WITH_UNIT() MEASURE_WITH_UNIT(value, unit))
        Some(_) => match measure.partial("MEASURE_WITH_UNIT") {
            Some(mwu) => (
                mwu.get(0).and_then(|v| v.as_float()),
                mwu.get(1).and_then(|v| v.as_entity_ref()),
            ),
            None => (None, None),
        },
        None => (
            measure.get_float(0),
            measure.get_ref(1),
        ),
    };

    let Some(value) = value else {
        return Ok(1.0);
    };

    let base = match unit_ref {
        Some(id) => {
            let base_unit = decoder.decode_by_id(id)?;
            length_unit_in_metres(decoder, &base_unit, depth + 1)?
        }
        None => 1.0,
    };

    Ok(value * base)
}
