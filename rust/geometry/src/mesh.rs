// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::error::{Error, Result};
use nalgebra::{Point3, Vector3};

/// Flat, non-indexed triangle buffer
///
/// Every triangle owns its three vertices, so `indices[i] == i` and
/// `positions.len() == normals.len() == 3 * indices.len()` hold after each
/// append. Positions and normals stay in f64 until serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f64>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f64>,
    /// Vertex indices, three per triangle
    pub indices: Vec<u32>,
}

impl MeshBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer sized for a number of triangles
    pub fn with_triangle_capacity(triangles: usize) -> Self {
        Self {
            positions: Vec::with_capacity(triangles * 9),
            normals: Vec::with_capacity(triangles * 9),
            indices: Vec::with_capacity(triangles * 3),
        }
    }

    /// Append one vertex with its normal; the index is the running count
    #[inline]
    pub fn append_vertex(&mut self, position: &Point3<f64>, normal: &Vector3<f64>) -> Result<()> {
        let index = vertex_index(self.indices.len())?;

        self.positions.push(position.x);
        self.positions.push(position.y);
        self.positions.push(position.z);

        self.normals.push(normal.x);
        self.normals.push(normal.y);
        self.normals.push(normal.z);

        self.indices.push(index);
        Ok(())
    }

    /// Append a triangle sharing one flat normal. Either all three vertices
    /// are appended or none.
    #[inline]
    pub fn append_triangle(&mut self, vertices: &[Point3<f64>; 3], normal: &Vector3<f64>) -> Result<()> {
        vertex_index(self.indices.len() + 2)?;
        for vertex in vertices {
            self.append_vertex(vertex, normal)?;
        }
        Ok(())
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Position of vertex `i`
    pub fn position(&self, i: usize) -> Option<Point3<f64>> {
        let chunk = self.positions.get(i * 3..i * 3 + 3)?;
        Some(Point3::new(chunk[0], chunk[1], chunk[2]))
    }

    /// Normal of vertex `i`
    pub fn normal(&self, i: usize) -> Option<Vector3<f64>> {
        let chunk = self.normals.get(i * 3..i * 3 + 3)?;
        Some(Vector3::new(chunk[0], chunk[1], chunk[2]))
    }
}

/// Index of the vertex at position `count`, which must fit in u32
#[inline]
fn vertex_index(count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::IndexOverflow { count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_vertex_assigns_running_index() {
        let mut mesh = MeshBuffer::new();
        assert!(mesh.is_empty());

        mesh.append_vertex(&Point3::new(1.0, 2.0, 3.0), &Vector3::z()).unwrap();
        mesh.append_vertex(&Point3::new(4.0, 5.0, 6.0), &Vector3::z()).unwrap();

        assert_eq!(mesh.positions, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(mesh.normals, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(mesh.indices, vec![0, 1]);
    }

    #[test]
    fn test_append_triangle_keeps_lengths_in_step() {
        let mut mesh = MeshBuffer::with_triangle_capacity(2);
        let tri = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        mesh.append_triangle(&tri, &Vector3::z()).unwrap();
        mesh.append_triangle(&tri, &-Vector3::z()).unwrap();

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.positions.len(), mesh.normals.len());
        assert_eq!(mesh.positions.len(), 3 * mesh.indices.len());
        assert!(mesh.indices.iter().enumerate().all(|(i, &idx)| idx as usize == i));
        assert_eq!(mesh.normal(4), Some(-Vector3::z()));
        assert_eq!(mesh.position(1), Some(Point3::new(1.0, 0.0, 0.0)));
        assert_eq!(mesh.position(6), None);
    }

    #[test]
    fn test_vertex_index_overflow() {
        assert_eq!(vertex_index(7).unwrap(), 7);
        assert_eq!(vertex_index(u32::MAX as usize).unwrap(), u32::MAX);
        let err = vertex_index(u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, Error::IndexOverflow { .. }));
    }
}
