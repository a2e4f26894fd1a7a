// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the heatmap pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while processing scenes and writing heatmaps
#[derive(Error, Debug)]
pub enum Error {
    /// An object node name carries no `_`-delimited identifier
    #[error("Malformed object name: {0}")]
    MalformedObjectName(String),

    #[error("Scene {0} has no root node")]
    EmptyScene(String),

    #[error("Failed to load scene {scene}: {source}")]
    SceneLoad {
        scene: String,
        #[source]
        source: scene_heatmap_core::Error,
    },

    #[error("Geometry error: {0}")]
    Geometry(#[from] scene_heatmap_geometry::Error),

    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image encoding failed for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Core error: {0}")]
    Core(#[from] scene_heatmap_core::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Output {
            path: path.into(),
            source,
        }
    }
}
