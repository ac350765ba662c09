// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vector helpers used by face extraction

use nalgebra::{Point3, Vector3};

/// Vectors shorter than this normalize to zero
pub const DEGENERATE_LENGTH: f64 = 1e-12;

/// Componentwise `a - b`
#[inline]
pub fn subtract(a: &Point3<f64>, b: &Point3<f64>) -> Vector3<f64> {
    a - b
}

/// Right-handed cross product
#[inline]
pub fn cross(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    a.cross(b)
}

/// Unit vector in the direction of `v`, or zero for degenerate input
#[inline]
pub fn normalize(v: &Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(DEGENERATE_LENGTH)
        .unwrap_or_else(Vector3::zeros)
}

/// Unit normal of triangle (a, b, c) following its winding
#[inline]
pub fn triangle_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Vector3<f64> {
    normalize(&cross(&subtract(b, a), &subtract(c, a)))
}
