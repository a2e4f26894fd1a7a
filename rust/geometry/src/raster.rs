// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle rasterization into occupancy grids
//!
//! Triangles are projected onto the ground plane, mapped through an
//! [`EgoFrame`] and filled with a scanline rule. Every vertex of a kept
//! triangle is clamped to `[0, resolution - 1]` and snapped down to its cell
//! corner, so a triangle that pokes out of the grid still fills the clipped,
//! possibly degenerate, shape that remains inside it and nothing is ever
//! written out of bounds.

use nalgebra::Point2;
use scene_heatmap_core::Triangle;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::EgoFrame;
use crate::grid::OccupancyGrid;

/// Which triangles are dropped instead of clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutOfGridPolicy {
    /// Drop a triangle only when all three vertices are outside the grid
    #[default]
    AllVertices,
    /// Drop a triangle as soon as any vertex is outside the grid
    AnyVertex,
}

/// Draws triangles into grids
#[derive(Debug, Clone, Copy, Default)]
pub struct Rasterizer {
    policy: OutOfGridPolicy,
}

impl Rasterizer {
    pub fn new(policy: OutOfGridPolicy) -> Self {
        Self { policy }
    }

    #[inline]
    pub fn policy(&self) -> OutOfGridPolicy {
        self.policy
    }

    /// Fill one triangle with 1s, returning whether it was drawn
    pub fn rasterize_triangle(
        &self,
        triangle: &Triangle,
        frame: &EgoFrame,
        grid: &mut OccupancyGrid,
    ) -> bool {
        let res = grid.resolution();
        let projected = triangle.project_xy().map(|p| frame.world_to_grid(&p));

        let outside = projected.iter().filter(|p| out_of_grid(p, res)).count();
        let discard = match self.policy {
            OutOfGridPolicy::AllVertices => outside == 3,
            OutOfGridPolicy::AnyVertex => outside > 0,
        };
        if discard {
            return false;
        }

        fill_triangle(grid, projected.map(|p| clamp_to_cell(&p, res)));
        true
    }

    /// Fill every triangle without thresholding, returning how many were drawn
    pub fn rasterize_triangles<'a>(
        &self,
        triangles: impl IntoIterator<Item = &'a Triangle>,
        frame: &EgoFrame,
        grid: &mut OccupancyGrid,
    ) -> usize {
        triangles
            .into_iter()
            .filter(|t| self.rasterize_triangle(t, frame, grid))
            .count()
    }

    /// Draw one object's triangles as a 0/1 silhouette and add it to `target`
    ///
    /// Overlapping triangles of the same object count once per cell.
    pub fn draw<'a>(
        &self,
        triangles: impl IntoIterator<Item = &'a Triangle>,
        frame: &EgoFrame,
        target: &mut OccupancyGrid,
    ) -> Result<usize> {
        let mut silhouette = target.zeros_like();
        let drawn = self.rasterize_triangles(triangles, frame, &mut silhouette);
        silhouette.threshold();
        target.add(&silhouette)?;
        Ok(drawn)
    }
}

#[inline]
fn out_of_grid(p: &Point2<f64>, resolution: usize) -> bool {
    let r = resolution as f64;
    !(p.x >= 0.0 && p.x < r && p.y >= 0.0 && p.y < r)
}

/// Clamp into the grid and snap to the cell corner
#[inline]
fn clamp_to_cell(p: &Point2<f64>, resolution: usize) -> (i64, i64) {
    let max = (resolution - 1) as f64;
    let snap = |v: f64| {
        if v.is_nan() {
            0
        } else {
            v.clamp(0.0, max).floor() as i64
        }
    };
    (snap(p.x), snap(p.y))
}

/// Scanline fill of a triangle with in-grid integer vertices
fn fill_triangle(grid: &mut OccupancyGrid, v: [(i64, i64); 3]) {
    let y_min = v.iter().map(|p| p.1).min().unwrap_or(0);
    let y_max = v.iter().map(|p| p.1).max().unwrap_or(0);
    let edges = [(v[0], v[1]), (v[1], v[2]), (v[2], v[0])];

    for y in y_min..=y_max {
        let mut x_lo = i64::MAX;
        let mut x_hi = i64::MIN;
        for &((ax, ay), (bx, by)) in &edges {
            if y < ay.min(by) || y > ay.max(by) {
                continue;
            }
            if ay == by {
                x_lo = x_lo.min(ax.min(bx));
                x_hi = x_hi.max(ax.max(bx));
            } else {
                let t = (y - ay) as f64 / (by - ay) as f64;
                let x = (ax as f64 + t * (bx - ax) as f64).round() as i64;
                x_lo = x_lo.min(x);
                x_hi = x_hi.max(x);
            }
        }
        if x_lo <= x_hi {
            grid.fill_span(y as usize, x_lo.max(0) as usize, x_hi.max(0) as usize, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameBuilder, SourcePose};
    use nalgebra::{Matrix3, Point3};

    fn identity_frame() -> EgoFrame {
        EgoFrame::from_matrix(Matrix3::identity()).unwrap()
    }

    fn tri(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Triangle {
        Triangle::new(
            Point3::new(a.0, a.1, 0.0),
            Point3::new(b.0, b.1, 1.0),
            Point3::new(c.0, c.1, 2.0),
        )
    }

    #[test]
    fn test_fill_right_triangle() {
        let mut grid = OccupancyGrid::new(10, 1.0).unwrap();
        let r = Rasterizer::default();
        assert!(r.rasterize_triangle(&tri((0.0, 0.0), (4.0, 0.0), (0.0, 4.0)), &identity_frame(), &mut grid));
        // rows 0..=4 hold 5, 4, 3, 2, 1 cells
        assert_eq!(grid.sum(), 15);
        assert_eq!(grid.get(4, 0), Some(1));
        assert_eq!(grid.get(0, 4), Some(1));
        assert_eq!(grid.get(4, 4), Some(0));
    }

    #[test]
    fn test_all_outside_is_noop() {
        let mut grid = OccupancyGrid::new(10, 1.0).unwrap();
        let r = Rasterizer::default();
        let t = tri((-5.0, -5.0), (-1.0, -5.0), (-5.0, -1.0));
        assert!(!r.rasterize_triangle(&t, &identity_frame(), &mut grid));
        assert!(grid.is_zero());

        // straddles the grid but every vertex is outside
        let t = tri((-5.0, 5.0), (15.0, 5.0), (5.0, 20.0));
        assert!(!r.rasterize_triangle(&t, &identity_frame(), &mut grid));
        assert!(grid.is_zero());
    }

    #[test]
    fn test_partial_triangle_is_clamped() {
        let mut grid = OccupancyGrid::new(10, 1.0).unwrap();
        let r = Rasterizer::new(OutOfGridPolicy::AllVertices);
        let t = tri((5.0, 5.0), (50.0, 5.0), (5.0, 50.0));
        assert!(r.rasterize_triangle(&t, &identity_frame(), &mut grid));
        assert_eq!(grid.get(9, 5), Some(1));
        assert_eq!(grid.get(5, 9), Some(1));
        assert_eq!(grid.get(4, 5), Some(0));
    }

    #[test]
    fn test_any_vertex_policy_drops_partial() {
        let mut grid = OccupancyGrid::new(10, 1.0).unwrap();
        let r = Rasterizer::new(OutOfGridPolicy::AnyVertex);
        let t = tri((5.0, 5.0), (50.0, 5.0), (5.0, 50.0));
        assert!(!r.rasterize_triangle(&t, &identity_frame(), &mut grid));
        assert!(grid.is_zero());
    }

    #[test]
    fn test_degenerate_triangle_fills_line() {
        let mut grid = OccupancyGrid::new(10, 1.0).unwrap();
        let t = tri((1.0, 2.0), (6.0, 2.0), (3.0, 2.0));
        Rasterizer::default().rasterize_triangle(&t, &identity_frame(), &mut grid);
        assert_eq!(grid.sum(), 6);
    }

    #[test]
    fn test_draw_thresholds_overlap() {
        let mut target = OccupancyGrid::new(10, 1.0).unwrap();
        let t = tri((0.0, 0.0), (4.0, 0.0), (0.0, 4.0));
        let drawn = Rasterizer::default()
            .draw([&t, &t], &identity_frame(), &mut target)
            .unwrap();
        assert_eq!(drawn, 2);
        assert_eq!(target.max(), 1);
        assert_eq!(target.sum(), 15);
    }

    #[test]
    fn test_draw_through_ego_frame() {
        let builder = FrameBuilder::new(15.0, 90).unwrap();
        let frame = builder
            .source_frame(&SourcePose::new(nalgebra::Point2::new(2.0, 3.0), 0.0))
            .unwrap();
        let mut target = OccupancyGrid::new(90, 15.0).unwrap();
        // a small square around the source centroid
        let a = tri((1.9, 2.9), (2.1, 2.9), (2.1, 3.1));
        let b = tri((1.9, 2.9), (2.1, 3.1), (1.9, 3.1));
        Rasterizer::default()
            .draw([&a, &b], &frame, &mut target)
            .unwrap();
        assert_eq!(target.get(44, 44), Some(1));
        assert_eq!(target.get(0, 0), Some(0));
    }
}
