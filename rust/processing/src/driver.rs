// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch driver: loads scenes, aggregates them in parallel and writes the
//! results.
//!
//! Each scene is processed into its own [`AggregationState`] on a rayon
//! worker and folded into that worker's running batch. The per-worker
//! batches are then reduced pairwise with [`AggregationState::merge`]. A
//! scene that fails to load or process is recorded by id and contributes
//! nothing.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use scene_heatmap_core::{load_project_ids, CategoryTable, Scene, SceneAssembler};
use serde::Serialize;

use crate::aggregator::{HeatmapAggregator, SceneSummary};
use crate::config::{HeatmapConfig, RunConfig};
use crate::error::{Error, Result};
use crate::output::{write_outputs, OutputSummary};
use crate::state::AggregationState;

pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

/// Scenes folded into one state
#[derive(Debug, Clone)]
pub struct SceneBatch {
    pub state: AggregationState,
    pub succeeded: usize,
    /// Ids of scenes that contributed nothing because they failed
    pub failed: Vec<String>,
}

impl SceneBatch {
    fn empty(aggregator: &HeatmapAggregator<'_>) -> Self {
        Self {
            state: aggregator.empty_state(),
            succeeded: 0,
            failed: Vec::new(),
        }
    }

    fn merge(mut self, other: SceneBatch) -> Result<Self> {
        self.state.merge(other.state)?;
        self.succeeded += other.succeeded;
        self.failed.extend(other.failed);
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairTotal {
    pub source: String,
    pub neighbor: String,
    pub count: u64,
}

/// Final tally of a run, written as `run_summary.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub scenes_attempted: usize,
    pub scenes_succeeded: usize,
    pub scenes_failed: usize,
    pub failed_scenes: Vec<String>,
    pub category_counts: BTreeMap<String, u64>,
    pub pair_counts: Vec<PairTotal>,
    pub outputs: OutputSummary,
    pub elapsed_ms: u64,
}

impl RunReport {
    fn new(attempted: usize, mut batch: SceneBatch, outputs: OutputSummary, elapsed: Duration) -> Self {
        batch.failed.sort();
        let category_counts = batch
            .state
            .sorted_object_counts()
            .into_iter()
            .map(|(category, count)| (category.to_string(), count))
            .collect();
        let pair_counts = batch
            .state
            .sorted_heatmaps()
            .into_iter()
            .map(|(key, heatmap)| PairTotal {
                source: key.source.clone(),
                neighbor: key.neighbor.clone(),
                count: heatmap.count,
            })
            .collect();

        Self {
            scenes_attempted: attempted,
            scenes_succeeded: batch.succeeded,
            scenes_failed: batch.failed.len(),
            failed_scenes: batch.failed,
            category_counts,
            pair_counts,
            outputs,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Run the whole pipeline described by `run` with grid settings `config`
pub fn run(run: &RunConfig, config: &HeatmapConfig) -> Result<RunReport> {
    let start = Instant::now();

    let table = CategoryTable::read(&run.category_table)?;
    let mut ids = load_project_ids(&run.project_list)?;
    if let Some(max) = run.max_scenes {
        ids.truncate(max);
    }

    tracing::info!(
        scenes = ids.len(),
        categories = table.len(),
        resolution = config.resolution(),
        pixels_per_meter = config.pixels_per_meter,
        threshold = config.proximity_threshold,
        workers = run.workers,
        "Starting heatmap run"
    );

    let aggregator = HeatmapAggregator::new(*config, &table)?;
    let assembler = SceneAssembler::new(run.data_root.clone());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(run.workers.max(1))
        .build()?;

    let batch = pool.install(|| {
        aggregate_scenes(&aggregator, &ids, |id| assembler.load_scene(id))
    })?;

    std::fs::create_dir_all(&run.output_dir).map_err(|e| Error::output(&run.output_dir, e))?;
    let outputs = write_outputs(
        &batch.state,
        &run.output_dir,
        config.meters_of_context,
        run.write_images,
    )?;

    let report = RunReport::new(ids.len(), batch, outputs, start.elapsed());
    write_report(&run.output_dir.join(RUN_SUMMARY_FILE), &report)?;

    tracing::info!(
        attempted = report.scenes_attempted,
        succeeded = report.scenes_succeeded,
        failed = report.scenes_failed,
        categories = report.category_counts.len(),
        pairs = report.pair_counts.len(),
        elapsed_ms = report.elapsed_ms,
        "Heatmap run complete"
    );
    Ok(report)
}

/// Process `ids` in parallel on the current rayon pool
///
/// `load` turns a scene id into a scene. Load and processing failures are
/// logged and listed in [`SceneBatch::failed`]; only a merge of mismatched
/// states is an error.
pub fn aggregate_scenes<F>(
    aggregator: &HeatmapAggregator<'_>,
    ids: &[String],
    load: F,
) -> Result<SceneBatch>
where
    F: Fn(&str) -> scene_heatmap_core::Result<Scene> + Sync,
{
    let total = ids.len();
    let done = AtomicUsize::new(0);

    ids.par_iter()
        .try_fold(
            || SceneBatch::empty(aggregator),
            |mut batch, id| -> Result<SceneBatch> {
                let start = Instant::now();
                let outcome = process_one(aggregator, id, &load);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;

                match outcome {
                    Ok((state, summary)) => {
                        tracing::info!(
                            progress = n,
                            total,
                            scene = %id,
                            located = summary.located,
                            pairs = summary.pairs,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "Processed scene"
                        );
                        batch.state.merge(state)?;
                        batch.succeeded += 1;
                    }
                    Err(e) => {
                        tracing::warn!(progress = n, total, scene = %id, error = %e, "Scene failed");
                        batch.failed.push(id.clone());
                    }
                }
                Ok(batch)
            },
        )
        .try_reduce(|| SceneBatch::empty(aggregator), SceneBatch::merge)
}

fn process_one<F>(
    aggregator: &HeatmapAggregator<'_>,
    id: &str,
    load: &F,
) -> Result<(AggregationState, SceneSummary)>
where
    F: Fn(&str) -> scene_heatmap_core::Result<Scene>,
{
    let scene = load(id).map_err(|source| Error::SceneLoad {
        scene: id.to_string(),
        source,
    })?;
    aggregator.process_scene(&scene)
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|e| Error::output(path, e))
}
