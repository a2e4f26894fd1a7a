// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle mesh data structures

use nalgebra::{Matrix4, Point2, Point3};

/// An ordered triple of world-space vertex positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3<f64>; 3],
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    #[inline]
    pub fn v0(&self) -> Point3<f64> {
        self.vertices[0]
    }

    /// Average of the three X coordinates
    #[inline]
    pub fn average_x(&self) -> f64 {
        (self.vertices[0].x + self.vertices[1].x + self.vertices[2].x) / 3.0
    }

    /// Average of the three Y coordinates
    #[inline]
    pub fn average_y(&self) -> f64 {
        (self.vertices[0].y + self.vertices[1].y + self.vertices[2].y) / 3.0
    }

    /// Ground-plane projection (drops Z)
    #[inline]
    pub fn project_xy(&self) -> [Point2<f64>; 3] {
        self.vertices.map(|v| Point2::new(v.x, v.y))
    }
}

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Bounds3 {
    /// Degenerate box around a single point
    #[inline]
    pub fn from_point(p: Point3<f64>) -> Self {
        Self { min: p, max: p }
    }

    #[inline]
    pub fn expand(&mut self, p: Point3<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    #[inline]
    pub fn union(&mut self, other: &Bounds3) {
        self.expand(other.min);
        self.expand(other.max);
    }

    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::new(
            0.5 * (self.min.x + self.max.x),
            0.5 * (self.min.y + self.max.y),
            0.5 * (self.min.z + self.max.z),
        )
    }
}

/// Indexed triangle mesh
///
/// One mesh corresponds to one shape of a loaded model file (one `o`/`g`
/// group in OBJ terms). Wall rooms are loaded as a list of these, one per
/// physical wall fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f64>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Build a triangle soup mesh (three fresh vertices per triangle)
    pub fn from_triangles(triangles: &[Triangle]) -> Self {
        let mut mesh = Self::with_capacity(triangles.len() * 3, triangles.len() * 3);
        for triangle in triangles {
            mesh.push_triangle(triangle);
        }
        mesh
    }

    /// Add a vertex, returning its index
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.push(position.x);
        self.positions.push(position.y);
        self.positions.push(position.z);
        index
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Append a triangle with its own three vertices
    #[inline]
    pub fn push_triangle(&mut self, triangle: &Triangle) {
        let i0 = self.add_vertex(triangle.vertices[0]);
        let i1 = self.add_vertex(triangle.vertices[1]);
        let i2 = self.add_vertex(triangle.vertices[2]);
        self.add_triangle(i0, i1, i2);
    }

    /// Merge another mesh into this one
    #[inline]
    pub fn merge(&mut self, other: &TriangleMesh) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = self.vertex_count() as u32;

        self.positions.reserve(other.positions.len());
        self.indices.reserve(other.indices.len());

        self.positions.extend_from_slice(&other.positions);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
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

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Vertex position by index
    #[inline]
    pub fn vertex(&self, index: u32) -> Point3<f64> {
        let i = index as usize * 3;
        Point3::new(self.positions[i], self.positions[i + 1], self.positions[i + 2])
    }

    /// Triangle by index
    #[inline]
    pub fn triangle(&self, index: usize) -> Triangle {
        let i = index * 3;
        Triangle::new(
            self.vertex(self.indices[i]),
            self.vertex(self.indices[i + 1]),
            self.vertex(self.indices[i + 2]),
        )
    }

    /// Iterate over all triangles
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangle_count()).map(move |t| self.triangle(t))
    }

    /// Calculate bounds over referenced vertices, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Bounds3> {
        let mut chunks = self.positions.chunks_exact(3);
        let first = chunks.next()?;
        let mut bounds = Bounds3::from_point(Point3::new(first[0], first[1], first[2]));
        chunks.for_each(|chunk| bounds.expand(Point3::new(chunk[0], chunk[1], chunk[2])));
        Some(bounds)
    }

    /// Apply an affine transform to every vertex in-place
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for chunk in self.positions.chunks_exact_mut(3) {
            let p = matrix.transform_point(&Point3::new(chunk[0], chunk[1], chunk[2]));
            chunk[0] = p.x;
            chunk[1] = p.y;
            chunk[2] = p.z;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 2.0),
        )
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = TriangleMesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
        assert!(mesh.bounds().is_none());
    }

    #[test]
    fn test_push_and_read_back() {
        let mut mesh = TriangleMesh::new();
        mesh.push_triangle(&unit_triangle());
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.triangle(0), unit_triangle());
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut a = TriangleMesh::from_triangles(&[unit_triangle()]);
        let b = TriangleMesh::from_triangles(&[unit_triangle()]);
        a.merge(&b);
        assert_eq!(a.triangle_count(), 2);
        assert_eq!(&a.indices[3..], &[3, 4, 5]);
    }

    #[test]
    fn test_bounds_and_centroid() {
        let mesh = TriangleMesh::from_triangles(&[unit_triangle()]);
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 2.0));
        assert_eq!(bounds.centroid(), Point3::new(0.5, 0.5, 1.0));
    }

    #[test]
    fn test_transform_translates_vertices() {
        let mut mesh = TriangleMesh::from_triangles(&[unit_triangle()]);
        mesh.transform(&Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0)));
        assert_relative_eq!(mesh.vertex(0), Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_triangle_averages() {
        let t = unit_triangle();
        assert_relative_eq!(t.average_x(), 1.0 / 3.0);
        assert_relative_eq!(t.average_y(), 1.0 / 3.0);
    }
}
