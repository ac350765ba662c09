// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement and point parsing for STEP geometry
//!
//! STEP geometric entities lead with a name attribute, so the location of
//! `AXIS2_PLACEMENT_3D('', location, axis, ref_direction)` sits at index 1.

use crate::error::{Error, Result};
use nalgebra::{Matrix4, Point3, Vector3};
use stepmesh_core::{DecodedEntity, EntityDecoder};

/// Parse a CARTESIAN_POINT by ID, trying the raw-bytes fast path first
pub fn parse_cartesian_point_from_id(
    point_id: u32,
    decoder: &mut EntityDecoder,
) -> Result<Point3<f64>> {
    if let Some((x, y, z)) = decoder.get_cartesian_point_fast(point_id) {
        return Ok(Point3::new(x, y, z));
    }

    let point = decoder.decode_by_id(point_id)?;
    parse_cartesian_point(&point)
}

/// Parse a decoded CARTESIAN_POINT('', (x, y, z))
pub fn parse_cartesian_point(point: &DecodedEntity) -> Result<Point3<f64>> {
    if !point.is_a("CARTESIAN_POINT") {
        return Err(Error::geometry(format!(
            "Expected CARTESIAN_POINT, got {} (#{})",
            point.type_name, point.id
        )));
    }

    let (x, y, z) = point
        .get(1)
        .and_then(|v| v.as_coordinates())
        .ok_or_else(|| Error::geometry(format!("CARTESIAN_POINT #{} missing coordinates", point.id)))?;

    Ok(Point3::new(x, y, z))
}

/// Parse a decoded DIRECTION('', (x, y, z))
pub fn parse_direction(direction: &DecodedEntity) -> Result<Vector3<f64>> {
    if !direction.is_a("DIRECTION") {
        return Err(Error::geometry(format!(
            "Expected DIRECTION, got {} (#{})",
            direction.type_name, direction.id
        )));
    }

    let (x, y, z) = direction
        .get(1)
        .and_then(|v| v.as_coordinates())
        .ok_or_else(|| Error::geometry(format!("DIRECTION #{} missing ratios", direction.id)))?;

    Ok(Vector3::new(x, y, z))
}

/// Resolve an optional direction reference, falling back to `default`
fn optional_direction(
    entity: &DecodedEntity,
    index: usize,
    default: Vector3<f64>,
    decoder: &mut EntityDecoder,
) -> Result<Vector3<f64>> {
    match entity.get_ref(index) {
        Some(id) => parse_direction(&decoder.decode_by_id(id)?),
        None => Ok(default),
    }
}

/// Parse AXIS2_PLACEMENT_3D by ID into a local-to-parent matrix
pub fn parse_axis2_placement_3d_from_id(
    placement_id: u32,
    decoder: &mut EntityDecoder,
) -> Result<Matrix4<f64>> {
    let placement = decoder.decode_by_id(placement_id)?;
    parse_axis2_placement_3d(&placement, decoder)
}

/// Parse AXIS2_PLACEMENT_3D('', location, axis, ref_direction)
///
/// Axis defaults to +Z and ref_direction to +X. The ref direction is
/// projected onto the plane normal to the axis before building the frame.
pub fn parse_axis2_placement_3d(
    placement: &DecodedEntity,
    decoder: &mut EntityDecoder,
) -> Result<Matrix4<f64>> {
    if !placement.is_a("AXIS2_PLACEMENT_3D") {
        return Err(Error::geometry(format!(
            "Expected AXIS2_PLACEMENT_3D, got {} (#{})",
            placement.type_name, placement.id
        )));
    }

    let location = match placement.get_ref(1) {
        Some(id) => parse_cartesian_point_from_id(id, decoder)?,
        None => Point3::origin(),
    };
    let z_axis = optional_direction(placement, 2, Vector3::z(), decoder)?;
    let x_axis = optional_direction(placement, 3, Vector3::x(), decoder)?;

    Ok(frame_matrix(&location, &z_axis, &x_axis))
}

/// Build a right-handed frame from an origin, a Z axis and an X hint
pub fn frame_matrix(origin: &Point3<f64>, z_axis: &Vector3<f64>, x_hint: &Vector3<f64>) -> Matrix4<f64> {
    let z = z_axis.try_normalize(1e-12).unwrap_or_else(Vector3::z);
    let x_normalized = x_hint.try_normalize(1e-12).unwrap_or_else(Vector3::x);

    let x_orthogonal = x_normalized - z * x_normalized.dot(&z);
    let x = if x_orthogonal.norm() > 1e-6 {
        x_orthogonal.normalize()
    } else if z.z.abs() < 0.9 {
        // X parallel to Z: pick any perpendicular
        Vector3::z().cross(&z).normalize()
    } else {
        Vector3::x().cross(&z).normalize()
    };

    let y = z.cross(&x).normalize();

    Matrix4::new(
        x.x, y.x, z.x, origin.x,
        x.y, y.y, z.y, origin.y,
        x.z, y.z, z.z, origin.z,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Uniform scale from file units to millimetres
#[inline]
pub fn unit_scale_matrix(mm_per_unit: f64) -> Matrix4<f64> {
    Matrix4::new_scaling(mm_per_unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CONTENT: &str = "DATA;
#1=CARTESIAN_POINT('',(10.,0.,5.));
#2=DIRECTION('',(0.,0.,2.));
#3=DIRECTION('',(0.,1.,0.));
#4=AXIS2_PLACEMENT_3D('',#1,#2,#3);
#5=AXIS2_PLACEMENT_3D('',#1,$,$);
#6=DIRECTION('',(1.,0.,0.));
#7=DIRECTION('',(1.,1.,0.));
#8=AXIS2_PLACEMENT_3D('',#1,#6,#7);
ENDSEC;";

    #[test]
    fn test_placement_with_axes() {
        let mut decoder = EntityDecoder::new(CONTENT);
        let m = parse_axis2_placement_3d_from_id(4, &mut decoder).unwrap();

        let p = m.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(10.0, 1.0, 5.0), epsilon = 1e-12);

        let q = m.transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(q, Point3::new(9.0, 0.0, 5.0), epsilon = 1e-12);
    }

    #[test]
    fn test_placement_defaults() {
        let mut decoder = EntityDecoder::new(CONTENT);
        let m = parse_axis2_placement_3d_from_id(5, &mut decoder).unwrap();
        assert_relative_eq!(
            m.transform_point(&Point3::new(1.0, 2.0, 3.0)),
            Point3::new(11.0, 2.0, 8.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_ref_direction_is_orthogonalized() {
        let mut decoder = EntityDecoder::new(CONTENT);
        let m = parse_axis2_placement_3d_from_id(8, &mut decoder).unwrap();
        // Z = +X, ref (1,1,0) projects to +Y
        let local_x = m.transform_vector(&Vector3::x());
        assert_relative_eq!(local_x, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_wrong_type_is_error() {
        let mut decoder = EntityDecoder::new(CONTENT);
        assert!(parse_axis2_placement_3d_from_id(1, &mut decoder).is_err());
        let dir = decoder.decode_by_id(2).unwrap();
        assert!(parse_cartesian_point(&dir).is_err());
    }

    #[test]
    fn test_unit_scale_matrix() {
        let m = unit_scale_matrix(25.4);
        assert_relative_eq!(
            m.transform_point(&Point3::new(1.0, 2.0, 0.0)),
            Point3::new(25.4, 50.8, 0.0),
            epsilon = 1e-12
        );
    }
}
