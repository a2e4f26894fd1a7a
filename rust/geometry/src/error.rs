// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during frame construction and rasterization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid grid resolution: {0}")]
    InvalidResolution(usize),

    #[error("Invalid pixels per meter: {0}")]
    InvalidScale(f64),

    #[error("Grid shape mismatch: {expected}x{expected} vs {actual}x{actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Cell ({x}, {y}) would exceed the u32 count range")]
    CountOverflow { x: usize, y: usize },

    #[error("World-to-grid transform is not invertible")]
    SingularTransform,
}
