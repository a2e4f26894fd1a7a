// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Square occupancy-count grids

use crate::error::{Error, Result};

/// Summary statistics of a grid's cell values
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GridStats {
    /// Number of non-zero cells
    pub cardinality: usize,
    pub min: u32,
    pub max: u32,
    pub l1_norm: f64,
    pub l2_norm: f64,
}

/// A `resolution x resolution` grid of non-negative counts
///
/// Cells are stored row-major: cell `(x, y)` lives at `y * resolution + x`.
/// The same type serves as the transient 0/1 grid of one drawn object and as
/// the aggregate heatmap summed over a whole dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    resolution: usize,
    pixels_per_meter: f64,
    cells: Vec<u32>,
}

impl OccupancyGrid {
    /// An all-zero grid
    pub fn new(resolution: usize, pixels_per_meter: f64) -> Result<Self> {
        if resolution == 0 {
            return Err(Error::InvalidResolution(resolution));
        }
        if !(pixels_per_meter.is_finite() && pixels_per_meter > 0.0) {
            return Err(Error::InvalidScale(pixels_per_meter));
        }
        Ok(Self {
            resolution,
            pixels_per_meter,
            cells: vec![0; resolution * resolution],
        })
    }

    /// An all-zero grid with the same shape and scale as `self`
    pub fn zeros_like(&self) -> Self {
        Self {
            resolution: self.resolution,
            pixels_per_meter: self.pixels_per_meter,
            cells: vec![0; self.cells.len()],
        }
    }

    /// Wrap existing row-major counts
    pub fn from_cells(resolution: usize, pixels_per_meter: f64, cells: Vec<u32>) -> Result<Self> {
        let mut grid = Self::new(resolution, pixels_per_meter)?;
        if cells.len() != grid.cells.len() {
            return Err(Error::ShapeMismatch {
                expected: resolution,
                actual: (cells.len() as f64).sqrt() as usize,
            });
        }
        grid.cells = cells;
        Ok(grid)
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn pixels_per_meter(&self) -> f64 {
        self.pixels_per_meter
    }

    #[inline]
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Value at `(x, y)`, `None` outside the grid
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.resolution && y < self.resolution).then(|| self.cells[y * self.resolution + x])
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u32) {
        if x < self.resolution && y < self.resolution {
            self.cells[y * self.resolution + x] = value;
        }
    }

    /// Write `value` into cells `x0..=x1` of row `y`, clipped to the grid
    pub fn fill_span(&mut self, y: usize, x0: usize, x1: usize, value: u32) {
        if y >= self.resolution || x0 > x1 || x0 >= self.resolution {
            return;
        }
        let x1 = x1.min(self.resolution - 1);
        let row = y * self.resolution;
        self.cells[row + x0..=row + x1].fill(value);
    }

    /// Elementwise sum into `self`
    ///
    /// Fails without touching `self` when any cell would overflow.
    pub fn add(&mut self, other: &OccupancyGrid) -> Result<()> {
        if other.resolution != self.resolution {
            return Err(Error::ShapeMismatch {
                expected: self.resolution,
                actual: other.resolution,
            });
        }
        let overflow = self
            .cells
            .iter()
            .zip(&other.cells)
            .position(|(a, b)| a.checked_add(*b).is_none());
        if let Some(i) = overflow {
            return Err(Error::CountOverflow {
                x: i % self.resolution,
                y: i / self.resolution,
            });
        }
        for (a, b) in self.cells.iter_mut().zip(&other.cells) {
            *a += *b;
        }
        Ok(())
    }

    /// Map every positive cell to 1
    pub fn threshold(&mut self) {
        for cell in &mut self.cells {
            *cell = u32::from(*cell > 0);
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    pub fn is_zero(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    pub fn sum(&self) -> u64 {
        self.cells.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn max(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    pub fn stats(&self) -> GridStats {
        let mut stats = GridStats {
            min: u32::MAX,
            ..Default::default()
        };
        let mut sum_sq = 0.0;
        for &c in &self.cells {
            if c > 0 {
                stats.cardinality += 1;
            }
            stats.min = stats.min.min(c);
            stats.max = stats.max.max(c);
            stats.l1_norm += f64::from(c);
            sum_sq += f64::from(c) * f64::from(c);
        }
        stats.l2_norm = sum_sq.sqrt();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_rejects_bad_shape() {
        assert_eq!(OccupancyGrid::new(0, 15.0), Err(Error::InvalidResolution(0)));
        assert_eq!(OccupancyGrid::new(4, -1.0), Err(Error::InvalidScale(-1.0)));
        assert_relative_eq!(OccupancyGrid::new(4, 15.0).unwrap().pixels_per_meter(), 15.0);
    }

    #[test]
    fn test_add_and_threshold() {
        let mut a = OccupancyGrid::new(3, 15.0).unwrap();
        let mut b = a.zeros_like();
        b.set(1, 2, 5);
        a.add(&b).unwrap();
        a.add(&b).unwrap();
        assert_eq!(a.get(1, 2), Some(10));

        a.threshold();
        assert_eq!(a.get(1, 2), Some(1));
        assert_eq!(a.sum(), 1);
    }

    #[test]
    fn test_add_shape_mismatch() {
        let mut a = OccupancyGrid::new(3, 15.0).unwrap();
        let b = OccupancyGrid::new(4, 15.0).unwrap();
        assert_eq!(
            a.add(&b),
            Err(Error::ShapeMismatch {
                expected: 3,
                actual: 4
            })
        );
    }

    #[test]
    fn test_add_overflow_leaves_grid_unchanged() {
        let mut a = OccupancyGrid::new(3, 15.0).unwrap();
        a.set(0, 0, 5);
        a.set(2, 1, u32::MAX);
        let mut b = OccupancyGrid::new(3, 15.0).unwrap();
        b.set(0, 0, 1);
        b.set(2, 1, 1);

        let before = a.clone();
        assert_eq!(a.add(&b), Err(Error::CountOverflow { x: 2, y: 1 }));
        assert_eq!(a, before);
    }

    #[test]
    fn test_fill_span_clips() {
        let mut g = OccupancyGrid::new(4, 15.0).unwrap();
        g.fill_span(1, 2, 10, 1);
        g.fill_span(9, 0, 3, 1);
        assert_eq!(g.sum(), 2);
        assert_eq!(g.get(3, 1), Some(1));
        assert_eq!(g.get(4, 1), None);
    }

    #[test]
    fn test_stats() {
        let mut g = OccupancyGrid::new(2, 15.0).unwrap();
        g.set(0, 0, 3);
        g.set(1, 1, 4);
        let s = g.stats();
        assert_eq!(s.cardinality, 2);
        assert_eq!(s.min, 0);
        assert_eq!(s.max, 4);
        assert_relative_eq!(s.l1_norm, 7.0);
        assert_relative_eq!(s.l2_norm, 5.0);
    }
}
