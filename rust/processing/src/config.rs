// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heatmap and run configuration.

use std::path::{Path, PathBuf};

use scene_heatmap_geometry::{OutOfGridPolicy, DEFAULT_ORIENTATION_EPSILON};
use serde::{Deserialize, Serialize};

/// Grid geometry and neighbor selection for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapConfig {
    /// Grid cells per world metre.
    pub pixels_per_meter: f64,
    /// World distance shown on each side of the source object.
    pub meters_of_context: f64,
    /// Neighbors whose centroid is closer than this (metres) are drawn.
    pub proximity_threshold: f64,
    /// Across-wall distance within which wall fragments merge.
    pub wall_merge_tolerance: f64,
    /// Orientation test tolerance for wall fragments.
    pub wall_orientation_epsilon: f64,
    pub out_of_grid_policy: OutOfGridPolicy,
    /// Cluster wall fragments instead of drawing whole wall nodes.
    pub cluster_walls: bool,
}

impl HeatmapConfig {
    /// 15 px/m with 3 m of context: 90 x 90 grids.
    pub fn coarse() -> Self {
        Self::with_scale(15.0, 3.0, 0.5)
    }

    /// 50 px/m with 4 m of context: 400 x 400 grids.
    pub fn fine() -> Self {
        Self::with_scale(50.0, 4.0, 0.2)
    }

    fn with_scale(pixels_per_meter: f64, meters_of_context: f64, wall_merge_tolerance: f64) -> Self {
        Self {
            pixels_per_meter,
            meters_of_context,
            proximity_threshold: meters_of_context + 1.0,
            wall_merge_tolerance,
            wall_orientation_epsilon: DEFAULT_ORIENTATION_EPSILON,
            out_of_grid_policy: OutOfGridPolicy::AllVertices,
            cluster_walls: true,
        }
    }

    /// Grid side length in cells.
    pub fn resolution(&self) -> usize {
        (self.pixels_per_meter * 2.0 * self.meters_of_context).round().max(0.0) as usize
    }
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self::coarse()
    }
}

/// Input and output locations plus batch limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Root of the Planner5D data tree.
    pub data_root: PathBuf,
    /// Directory receiving grids and statistics.
    pub output_dir: PathBuf,
    /// Newline-separated project ids.
    pub project_list: PathBuf,
    /// `id,category` table.
    pub category_table: PathBuf,
    /// Stop after this many scenes.
    pub max_scenes: Option<usize>,
    /// Worker threads for scene processing.
    pub workers: usize,
    /// Also write a PNG preview next to each grid.
    pub write_images: bool,
}

impl RunConfig {
    /// Defaults for a data root: list and table live inside it.
    pub fn new(data_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        Self {
            project_list: data_root.join("list-of-projects.txt"),
            category_table: data_root.join("object_names.csv"),
            data_root,
            output_dir: output_dir.into(),
            max_scenes: None,
            workers: num_cpus::get(),
            write_images: false,
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_presets() {
        let coarse = HeatmapConfig::default();
        assert_eq!(coarse.resolution(), 90);
        assert_relative_eq!(coarse.proximity_threshold, 4.0);
        assert_relative_eq!(coarse.wall_merge_tolerance, 0.5);
        assert_eq!(coarse.out_of_grid_policy, OutOfGridPolicy::AllVertices);

        let fine = HeatmapConfig::fine();
        assert_eq!(fine.resolution(), 400);
        assert_relative_eq!(fine.proximity_threshold, 5.0);
        assert_relative_eq!(fine.wall_merge_tolerance, 0.2);
    }

    #[test]
    fn test_run_config_defaults() {
        let run = RunConfig::new("/data", "/out");
        assert_eq!(run.project_list, PathBuf::from("/data/list-of-projects.txt"));
        assert_eq!(run.category_table, PathBuf::from("/data/object_names.csv"));
        assert!(run.workers >= 1);
        assert_eq!(run.max_scenes, None);
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&HeatmapConfig::fine()).unwrap();
        assert!(json.contains("\"all-vertices\""));
        let back: HeatmapConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, HeatmapConfig::fine());
    }
}
