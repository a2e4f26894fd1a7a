// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! scene-heatmaps - category co-occurrence heatmaps from Planner5D scenes.
//!
//! Reads the project list and category table from the data directory, builds
//! one heatmap per `(source, neighbor)` category pair and writes them with
//! summary tables into the output directory.
//!
//! ```bash
//! scene-heatmaps data/ out/ --max-scenes 100 -v
//! RUST_LOG=scene_heatmap_processing=trace scene-heatmaps data/ out/ --fine
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use scene_heatmap_processing::{HeatmapConfig, OutOfGridPolicy, RunConfig};
use tracing_subscriber::EnvFilter;

/// Build category co-occurrence heatmaps from floorplan scenes.
#[derive(Parser, Debug)]
#[command(name = "scene-heatmaps")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data root holding projects_clean/, roomfiles/ and objects/
    data_dir: PathBuf,

    /// Directory receiving grids and statistics
    output_dir: PathBuf,

    /// Debug logging for the heatmap crates
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Trace logging, including scene tree dumps
    #[arg(short, long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Stop after this many scenes from the project list
    #[arg(short = 'n', long)]
    max_scenes: Option<usize>,

    /// Use the fine preset (50 px/m, 4 m of context) instead of the coarse one
    #[arg(long, action = ArgAction::SetTrue)]
    fine: bool,

    /// Grid cells per metre, overriding the preset
    #[arg(short = 'p', long)]
    pixels_per_meter: Option<f64>,

    /// Metres of context on each side of the source, overriding the preset
    #[arg(short = 'c', long)]
    context: Option<f64>,

    /// Neighbor distance threshold in metres (default: context + 1)
    #[arg(short = 't', long)]
    threshold: Option<f64>,

    /// Across-wall merge tolerance for wall fragments, in metres
    #[arg(long)]
    wall_tolerance: Option<f64>,

    /// Skip triangles with any vertex off the grid, not only those with all
    #[arg(long, action = ArgAction::SetTrue)]
    any_vertex: bool,

    /// Draw whole wall nodes instead of clustered wall fragments
    #[arg(long, action = ArgAction::SetTrue)]
    no_wall_clustering: bool,

    /// Worker threads (default: number of CPUs)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Also write a PNG preview of every grid
    #[arg(long, action = ArgAction::SetTrue)]
    write_images: bool,

    /// Project id list (default: <DATA_DIR>/list-of-projects.txt)
    #[arg(long)]
    project_list: Option<PathBuf>,

    /// `id,category` table (default: <DATA_DIR>/object_names.csv)
    #[arg(long)]
    categories: Option<PathBuf>,

    /// Print the run report as JSON on stdout
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

impl Args {
    fn heatmap_config(&self) -> HeatmapConfig {
        let mut config = if self.fine {
            HeatmapConfig::fine()
        } else {
            HeatmapConfig::coarse()
        };

        if let Some(ppm) = self.pixels_per_meter {
            config.pixels_per_meter = ppm;
        }
        if let Some(context) = self.context {
            config.meters_of_context = context;
        }
        config.proximity_threshold = self
            .threshold
            .unwrap_or(config.meters_of_context + 1.0);
        if let Some(tolerance) = self.wall_tolerance {
            config.wall_merge_tolerance = tolerance;
        }
        if self.any_vertex {
            config.out_of_grid_policy = OutOfGridPolicy::AnyVertex;
        }
        config.cluster_walls = !self.no_wall_clustering;
        config
    }

    fn run_config(&self) -> RunConfig {
        let mut run = RunConfig::new(&self.data_dir, &self.output_dir);
        if let Some(list) = &self.project_list {
            run.project_list = list.clone();
        }
        if let Some(table) = &self.categories {
            run.category_table = table.clone();
        }
        run.max_scenes = self.max_scenes;
        run.workers = self.workers.unwrap_or_else(num_cpus::get).max(1);
        run.write_images = self.write_images;
        run
    }

    fn log_filter(&self) -> EnvFilter {
        if std::env::var_os("RUST_LOG").is_some() {
            return EnvFilter::from_default_env();
        }
        let crates = if self.debug {
            "trace"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        };
        EnvFilter::new(format!(
            "info,scene_heatmap_core={crates},scene_heatmap_processing={crates},scene_heatmaps={crates}"
        ))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(args.log_filter())
        .with_target(false)
        .init();

    let heatmap = args.heatmap_config();
    let run = args.run_config();

    tracing::info!(
        data_dir = %run.data_root.display(),
        output_dir = %run.output_dir.display(),
        resolution = heatmap.resolution(),
        pixels_per_meter = heatmap.pixels_per_meter,
        context = heatmap.meters_of_context,
        threshold = heatmap.proximity_threshold,
        workers = run.workers,
        "Starting scene-heatmaps"
    );

    std::fs::create_dir_all(&run.output_dir).with_context(|| {
        format!("failed to create output directory {}", run.output_dir.display())
    })?;

    let report = scene_heatmap_processing::run(&run, &heatmap)
        .with_context(|| format!("heatmap run over {} failed", run.data_root.display()))?;

    for (category, count) in &report.category_counts {
        tracing::info!(category = %category, count, "category total");
    }
    for pair in &report.pair_counts {
        tracing::debug!(source = %pair.source, neighbor = %pair.neighbor, count = pair.count, "pair total");
    }
    if !report.failed_scenes.is_empty() {
        tracing::warn!(scenes = ?report.failed_scenes, "some scenes failed");
    }
    tracing::info!(
        succeeded = report.scenes_succeeded,
        failed = report.scenes_failed,
        grids = report.outputs.grids_written,
        elapsed_ms = report.elapsed_ms,
        "Done"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
