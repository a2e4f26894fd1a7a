// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Scene Heatmap Processing
//!
//! Turns floorplan scenes into category co-occurrence heatmaps. For every
//! categorised object, nearby objects and walls are drawn into a grid
//! centred on and aligned with that object, and the grids are summed per
//! `(source category, neighbor category)` pair across all scenes.
//!
//! ```rust,ignore
//! use scene_heatmap_processing::{run, HeatmapConfig, RunConfig};
//!
//! let report = run(&RunConfig::new("data", "out"), &HeatmapConfig::coarse())?;
//! println!("{} scenes failed", report.scenes_failed);
//! ```

pub mod aggregator;
pub mod category;
pub mod config;
pub mod driver;
pub mod error;
pub mod output;
pub mod scene_index;
pub mod state;

pub use aggregator::{HeatmapAggregator, SceneSummary};
pub use category::{object_identifier, CategoryResolver};
pub use config::{HeatmapConfig, RunConfig};
pub use driver::{aggregate_scenes, run, PairTotal, RunReport, SceneBatch, RUN_SUMMARY_FILE};
pub use error::{Error, Result};
pub use output::{
    grid_stem, read_grid, write_category_stats, write_grid, write_outputs, write_pair_stats,
    write_preview, OutputSummary, CATEGORY_STATS_FILE, PAIR_STATS_FILE,
};
pub use scene_index::SceneIndex;
pub use state::{AggregationState, CoOccurrenceKey, PairHeatmap, WALL_CATEGORY};

pub use scene_heatmap_geometry::OutOfGridPolicy;
