//! Scene-Heatmap Geometry
//!
//! Ground-plane geometry for egocentric co-occurrence heatmaps: wall fragment
//! clustering, per-object world-to-grid frames built with nalgebra, and
//! triangle rasterization into integer occupancy grids.

pub mod error;
pub mod frame;
pub mod grid;
pub mod raster;
pub mod wall_cluster;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Point2, Point3, Vector2};

pub use error::{Error, Result};
pub use frame::{EgoFrame, FrameBuilder, SourcePose};
pub use grid::{GridStats, OccupancyGrid};
pub use raster::{OutOfGridPolicy, Rasterizer};
pub use wall_cluster::{
    Extent2, Orientation, WallCluster, WallClusterer, WallFragment, DEFAULT_ORIENTATION_EPSILON,
};
