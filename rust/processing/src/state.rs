// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accumulated heatmaps and counters.
//!
//! An [`AggregationState`] is owned by whoever is accumulating: one per scene
//! while it is processed, folded into a per-worker total and finally merged
//! pairwise into the run total. Only the zero grid template is shared.
//!
//! Registering a key costs no grid. A pair's grid is allocated by its first
//! drawing; until then readers see the shared zero template.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use scene_heatmap_geometry::{Error as GeometryError, OccupancyGrid};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Neighbor category used for wall geometry
pub const WALL_CATEGORY: &str = "wall";

/// (source category, neighbor category or `"wall"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoOccurrenceKey {
    pub source: String,
    pub neighbor: String,
}

impl CoOccurrenceKey {
    pub fn new(source: impl Into<String>, neighbor: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            neighbor: neighbor.into(),
        }
    }

    pub fn wall(source: impl Into<String>) -> Self {
        Self::new(source, WALL_CATEGORY)
    }
}

impl fmt::Display for CoOccurrenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}___{}", self.source, self.neighbor)
    }
}

/// Aggregate grid and co-occurrence count of one key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairHeatmap {
    /// `None` until a neighbor is drawn for this key
    pub grid: Option<OccupancyGrid>,
    /// Number of neighbors drawn into `grid`
    pub count: u64,
}

impl PairHeatmap {
    /// The drawn grid, or `zeros` when nothing was drawn yet
    #[inline]
    pub fn grid_or<'a>(&'a self, zeros: &'a OccupancyGrid) -> &'a OccupancyGrid {
        self.grid.as_ref().unwrap_or(zeros)
    }
}

/// Heatmaps keyed by category pair plus per-category object counts
#[derive(Debug, Clone)]
pub struct AggregationState {
    template: Arc<OccupancyGrid>,
    heatmaps: FxHashMap<CoOccurrenceKey, PairHeatmap>,
    object_counts: FxHashMap<String, u64>,
}

impl AggregationState {
    /// Empty state whose grids are shaped like `template`
    pub fn new(template: &OccupancyGrid) -> Self {
        Self {
            template: Arc::new(template.zeros_like()),
            heatmaps: FxHashMap::default(),
            object_counts: FxHashMap::default(),
        }
    }

    /// Empty state sharing `self`'s zero template
    pub fn empty_like(&self) -> Self {
        Self {
            template: Arc::clone(&self.template),
            heatmaps: FxHashMap::default(),
            object_counts: FxHashMap::default(),
        }
    }

    /// All-zero grid standing in for pairs with nothing drawn
    #[inline]
    pub fn zero_grid(&self) -> &OccupancyGrid {
        &self.template
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.template.resolution()
    }

    #[inline]
    pub fn pixels_per_meter(&self) -> f64 {
        self.template.pixels_per_meter()
    }

    /// Heatmap for `key`, created empty on first use without a grid
    pub fn register(&mut self, key: CoOccurrenceKey) -> &mut PairHeatmap {
        self.heatmaps.entry(key).or_default()
    }

    /// Count one drawing for `key` and return the grid to draw into
    ///
    /// The grid is allocated zero-filled on the key's first drawing.
    pub fn record_draw(&mut self, key: CoOccurrenceKey) -> &mut OccupancyGrid {
        let template = &self.template;
        let heatmap = self.heatmaps.entry(key).or_default();
        heatmap.count += 1;
        heatmap.grid.get_or_insert_with(|| template.zeros_like())
    }

    /// Count one occurrence of an object of `category`
    pub fn record_object(&mut self, category: &str) {
        *self.object_counts.entry(category.to_string()).or_insert(0) += 1;
    }

    pub fn heatmap(&self, source: &str, neighbor: &str) -> Option<&PairHeatmap> {
        self.heatmaps.get(&CoOccurrenceKey::new(source, neighbor))
    }

    /// Grid of a registered pair, the zero template when nothing was drawn
    pub fn grid(&self, source: &str, neighbor: &str) -> Option<&OccupancyGrid> {
        self.heatmap(source, neighbor)
            .map(|h| h.grid_or(&self.template))
    }

    /// Number of pairs holding an allocated grid
    pub fn allocated_grids(&self) -> usize {
        self.heatmaps.values().filter(|h| h.grid.is_some()).count()
    }

    /// Co-occurrence count, zero for unseen pairs
    pub fn pair_count(&self, source: &str, neighbor: &str) -> u64 {
        self.heatmap(source, neighbor).map_or(0, |h| h.count)
    }

    /// Object count, zero for unseen categories
    pub fn object_count(&self, category: &str) -> u64 {
        self.object_counts.get(category).copied().unwrap_or(0)
    }

    pub fn heatmap_count(&self) -> usize {
        self.heatmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heatmaps.is_empty() && self.object_counts.is_empty()
    }

    /// Heatmaps ordered by key
    pub fn sorted_heatmaps(&self) -> Vec<(&CoOccurrenceKey, &PairHeatmap)> {
        let mut entries: Vec<_> = self.heatmaps.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Object counts ordered by category
    pub fn sorted_object_counts(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<_> = self
            .object_counts
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        entries.sort_unstable();
        entries
    }

    /// Fold another state into this one
    ///
    /// Grids are summed cell by cell and counters added, so the result does
    /// not depend on which state is merged into which.
    pub fn merge(&mut self, other: AggregationState) -> Result<()> {
        self.check_shape(&other.template)?;
        for (key, theirs) in other.heatmaps {
            if let Some(grid) = &theirs.grid {
                self.check_shape(grid)?;
            }
            match self.heatmaps.get_mut(&key) {
                Some(ours) => {
                    if let Some(grid) = theirs.grid {
                        match ours.grid.as_mut() {
                            Some(mine) => mine.add(&grid)?,
                            None => ours.grid = Some(grid),
                        }
                    }
                    ours.count += theirs.count;
                }
                None => {
                    self.heatmaps.insert(key, theirs);
                }
            }
        }
        for (category, count) in other.object_counts {
            *self.object_counts.entry(category).or_insert(0) += count;
        }
        Ok(())
    }

    fn check_shape(&self, grid: &OccupancyGrid) -> Result<()> {
        if grid.resolution() != self.resolution() {
            return Err(GeometryError::ShapeMismatch {
                expected: self.resolution(),
                actual: grid.resolution(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AggregationState {
        AggregationState::new(&OccupancyGrid::new(4, 15.0).unwrap())
    }

    #[test]
    fn test_register_is_lazy_and_zeroed() {
        let mut s = state();
        assert!(s.is_empty());
        s.register(CoOccurrenceKey::wall("chair"));
        assert_eq!(s.heatmap_count(), 1);
        assert_eq!(s.allocated_grids(), 0);
        assert!(s.heatmap("chair", WALL_CATEGORY).unwrap().grid.is_none());
        assert!(s.grid("chair", WALL_CATEGORY).unwrap().is_zero());
        assert_eq!(s.grid("chair", WALL_CATEGORY).unwrap().resolution(), 4);
        assert_eq!(s.pair_count("chair", WALL_CATEGORY), 0);
        assert_eq!(s.pair_count("chair", "table"), 0);
    }

    #[test]
    fn test_first_draw_allocates() {
        let mut s = state();
        s.register(CoOccurrenceKey::new("chair", "table"));
        s.record_draw(CoOccurrenceKey::new("chair", "table")).set(3, 0, 1);
        s.record_draw(CoOccurrenceKey::new("chair", "table"));

        assert_eq!(s.allocated_grids(), 1);
        assert_eq!(s.pair_count("chair", "table"), 2);
        assert_eq!(s.grid("chair", "table").unwrap().get(3, 0), Some(1));
        assert!(s.zero_grid().is_zero());
    }

    #[test]
    fn test_merge_sums() {
        let mut a = state();
        let mut b = state();
        for s in [&mut a, &mut b] {
            s.record_draw(CoOccurrenceKey::new("chair", "table")).set(1, 1, 1);
            s.record_object("chair");
        }
        b.register(CoOccurrenceKey::wall("table")).count = 3;

        a.merge(b).unwrap();
        assert_eq!(a.grid("chair", "table").unwrap().get(1, 1), Some(2));
        assert_eq!(a.pair_count("chair", "table"), 2);
        assert_eq!(a.pair_count("table", WALL_CATEGORY), 3);
        assert_eq!(a.object_count("chair"), 2);
        assert_eq!(a.allocated_grids(), 1);
    }

    #[test]
    fn test_merge_takes_grid_into_unallocated_pair() {
        let mut a = state();
        let mut b = a.empty_like();
        a.register(CoOccurrenceKey::new("lamp", "bed"));
        b.record_draw(CoOccurrenceKey::new("lamp", "bed")).set(0, 3, 1);

        a.merge(b).unwrap();
        assert_eq!(a.grid("lamp", "bed").unwrap().get(0, 3), Some(1));
        assert_eq!(a.pair_count("lamp", "bed"), 1);
    }

    #[test]
    fn test_merge_rejects_other_shape() {
        let mut a = state();
        let mut b = AggregationState::new(&OccupancyGrid::new(8, 15.0).unwrap());
        b.register(CoOccurrenceKey::wall("chair"));
        assert!(a.merge(b).is_err());

        // a drawn grid of the wrong shape is caught as well
        let mut c = state();
        c.register(CoOccurrenceKey::wall("chair")).grid =
            Some(OccupancyGrid::new(8, 15.0).unwrap());
        assert!(state().merge(c).is_err());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(CoOccurrenceKey::new("chair", "table").to_string(), "chair___table");
    }
}
