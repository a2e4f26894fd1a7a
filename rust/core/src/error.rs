// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for scene loading.

use std::path::PathBuf;

use thiserror::Error;

use crate::scene::NodeId;

/// Result type for scene loading operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading projects, meshes and tables
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed project: {0}")]
    MalformedProject(String),

    #[error("No project entry found in {0}")]
    NoProject(PathBuf),

    #[error("OBJ syntax error at line {line}: {message}")]
    ObjSyntax { line: usize, message: String },

    #[error("CSV syntax error at line {line}: {message}")]
    CsvSyntax { line: usize, message: String },

    #[error("CSV header is missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("Node {0} is not part of the scene")]
    UnknownNode(NodeId),
}

impl Error {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn obj(line: usize, message: impl Into<String>) -> Self {
        Error::ObjSyntax {
            line,
            message: message.into(),
        }
    }

    pub fn csv(line: usize, message: impl Into<String>) -> Self {
        Error::CsvSyntax {
            line,
            message: message.into(),
        }
    }
}
