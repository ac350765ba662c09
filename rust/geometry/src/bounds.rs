// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding box accumulator

use nalgebra::Point3;

/// Axis-aligned bounds folded over emitted vertices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new()
    }
}

impl Bounds {
    /// Empty bounds: min at +inf, max at -inf
    pub fn new() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// True until the first point is folded in
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Fold a point into the bounds
    #[inline]
    pub fn update(&mut self, point: &Point3<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Check whether a point lies inside (inclusive)
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.y..=self.max.y).contains(&point.y)
            && (self.min.z..=self.max.z).contains(&point.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let bounds = Bounds::new();
        assert!(bounds.is_empty());
    }

    #[test]
    fn test_single_point() {
        let mut bounds = Bounds::new();
        bounds.update(&Point3::new(1.0, -2.0, 3.0));
        assert!(!bounds.is_empty());
        assert_eq!(bounds.min, bounds.max);
        assert!(bounds.contains(&Point3::new(1.0, -2.0, 3.0)));
    }

    #[test]
    fn test_update_folds_componentwise() {
        let mut bounds = Bounds::new();
        bounds.update(&Point3::new(1.0, 5.0, -1.0));
        bounds.update(&Point3::new(-3.0, 2.0, 4.0));
        assert_eq!(bounds.min, Point3::new(-3.0, 2.0, -1.0));
        assert_eq!(bounds.max, Point3::new(1.0, 5.0, 4.0));
        assert!(!bounds.contains(&Point3::new(2.0, 3.0, 0.0)));
    }
}
