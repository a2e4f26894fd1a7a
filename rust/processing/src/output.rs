// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heatmap and statistics writers.
//!
//! Grid files (`<source>___<neighbor>.grd`) are little-endian binary:
//!
//! | bytes | content                         |
//! |-------|---------------------------------|
//! | 4     | magic `HMAP`                    |
//! | 4     | format version (`u32`)          |
//! | 4     | width in cells (`u32`)          |
//! | 4     | height in cells (`u32`)         |
//! | 8     | pixels per metre (`f64`)        |
//! | 8     | metres of context (`f64`)       |
//! | 4·w·h | counts (`u32`), row-major       |

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use scene_heatmap_geometry::OccupancyGrid;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::state::{AggregationState, CoOccurrenceKey};

pub const GRID_MAGIC: &[u8; 4] = b"HMAP";
pub const GRID_FORMAT_VERSION: u32 = 1;
pub const CATEGORY_STATS_FILE: &str = "stats_categories.csv";
pub const PAIR_STATS_FILE: &str = "stats_pairs.csv";

const HEADER_LEN: usize = 32;

/// What [`write_outputs`] produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputSummary {
    pub grids_written: usize,
    pub images_written: usize,
    /// Grids or previews that could not be written
    pub failed: Vec<PathBuf>,
}

/// File stem for a key, with path separators replaced
pub fn grid_stem(key: &CoOccurrenceKey) -> String {
    key.to_string().replace(['/', '\\'], "_")
}

/// Write every heatmap plus both statistics tables into `dir`
///
/// A failed grid or preview is logged and listed in the summary; the
/// remaining files are still written. Failing to write a statistics table is
/// an error.
pub fn write_outputs(
    state: &AggregationState,
    dir: &Path,
    meters_of_context: f64,
    write_images: bool,
) -> Result<OutputSummary> {
    let mut summary = OutputSummary::default();

    for (key, heatmap) in state.sorted_heatmaps() {
        let stem = grid_stem(key);
        let path = dir.join(format!("{stem}.grd"));
        let grid = heatmap.grid_or(state.zero_grid());
        let stats = grid.stats();
        tracing::debug!(
            key = %key,
            resolution = grid.resolution(),
            pixels_per_meter = grid.pixels_per_meter(),
            cardinality = stats.cardinality,
            min = stats.min,
            max = stats.max,
            l1 = stats.l1_norm,
            l2 = stats.l2_norm,
            "writing grid"
        );

        match write_grid(&path, grid, meters_of_context) {
            Ok(()) => summary.grids_written += 1,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to write grid");
                summary.failed.push(path);
            }
        }

        if write_images {
            let path = dir.join(format!("{stem}.png"));
            match write_preview(&path, grid) {
                Ok(()) => summary.images_written += 1,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "failed to write preview");
                    summary.failed.push(path);
                }
            }
        }
    }

    write_category_stats(&dir.join(CATEGORY_STATS_FILE), state)?;
    write_pair_stats(&dir.join(PAIR_STATS_FILE), state)?;

    tracing::info!(
        dir = %dir.display(),
        grids = summary.grids_written,
        images = summary.images_written,
        failed = summary.failed.len(),
        "wrote heatmaps"
    );
    Ok(summary)
}

/// Write one grid file
pub fn write_grid(path: &Path, grid: &OccupancyGrid, meters_of_context: f64) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::output(path, e))?;
    let mut out = BufWriter::new(file);
    let side = grid.resolution() as u32;

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(GRID_MAGIC);
    header.extend_from_slice(&GRID_FORMAT_VERSION.to_le_bytes());
    header.extend_from_slice(&side.to_le_bytes());
    header.extend_from_slice(&side.to_le_bytes());
    header.extend_from_slice(&grid.pixels_per_meter().to_le_bytes());
    header.extend_from_slice(&meters_of_context.to_le_bytes());

    let write = |out: &mut BufWriter<File>| -> std::io::Result<()> {
        out.write_all(&header)?;
        for cell in grid.cells() {
            out.write_all(&cell.to_le_bytes())?;
        }
        out.flush()
    };
    write(&mut out).map_err(|e| Error::output(path, e))
}

/// Read a grid file back, returning the grid and its metres of context
pub fn read_grid(path: &Path) -> Result<(OccupancyGrid, f64)> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| Error::output(path, e))?;

    let invalid = |message: &str| {
        Error::output(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, message.to_string()),
        )
    };
    if bytes.len() < HEADER_LEN || &bytes[..4] != GRID_MAGIC {
        return Err(invalid("not a heatmap grid"));
    }

    let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    let f64_at = |at: usize| {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[at..at + 8]);
        f64::from_le_bytes(raw)
    };

    if u32_at(4) != GRID_FORMAT_VERSION {
        return Err(invalid("unsupported grid version"));
    }
    let width = u32_at(8) as usize;
    let height = u32_at(12) as usize;
    let expected = 4usize
        .checked_mul(width)
        .and_then(|n| n.checked_mul(height))
        .and_then(|n| n.checked_add(HEADER_LEN));
    if width != height || expected != Some(bytes.len()) {
        return Err(invalid("grid size does not match header"));
    }

    let cells = bytes[HEADER_LEN..]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let grid = OccupancyGrid::from_cells(width, f64_at(16), cells)?;
    Ok((grid, f64_at(24)))
}

/// Grayscale preview scaled so the busiest cell is white
pub fn write_preview(path: &Path, grid: &OccupancyGrid) -> Result<()> {
    let side = grid.resolution() as u32;
    let max = grid.max().max(1) as f64;
    let cells = grid.cells();
    let image = GrayImage::from_fn(side, side, |x, y| {
        // image rows run top-down, grid rows bottom-up
        let row = (side - 1 - y) as usize;
        let value = cells[row * side as usize + x as usize] as f64 / max;
        Luma([(value * 255.0).round() as u8])
    });
    image.save(path).map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// `category,count`
pub fn write_category_stats(path: &Path, state: &AggregationState) -> Result<()> {
    let mut text = String::from("category,count\n");
    for (category, count) in state.sorted_object_counts() {
        text.push_str(&format!("{},{}\n", csv_field(category), count));
    }
    std::fs::write(path, text).map_err(|e| Error::output(path, e))
}

/// `src_cat,dst_cat,count`
pub fn write_pair_stats(path: &Path, state: &AggregationState) -> Result<()> {
    let mut text = String::from("src_cat,dst_cat,count\n");
    for (key, heatmap) in state.sorted_heatmaps() {
        text.push_str(&format!(
            "{},{},{}\n",
            csv_field(&key.source),
            csv_field(&key.neighbor),
            heatmap.count
        ));
    }
    std::fs::write(path, text).map_err(|e| Error::output(path, e))
}

fn csv_field(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\"")).into()
    } else {
        value.into()
    }
}
