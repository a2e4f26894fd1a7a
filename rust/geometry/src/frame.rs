// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Egocentric world-to-grid frames
//!
//! An [`EgoFrame`] maps ground-plane world coordinates into the cell
//! coordinates of one source object's heatmap. The source is centred on the
//! grid, scaled to pixels, de-rotated so that it always faces the same way,
//! and mirrored if the source itself is mirrored.
//!
//! Transforms are composed by post-multiplication, so the step listed last in
//! [`FrameBuilder::build`] is the first one applied to a point.

use std::f64::consts::FRAC_PI_2;

use nalgebra::{Matrix3, Point2, Rotation2, Vector2};
use scene_heatmap_core::ObjectPlacement;

use crate::error::{Error, Result};

/// Pose of the object a heatmap is centred on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePose {
    /// Ground-plane centroid in world metres
    pub centroid: Point2<f64>,
    /// Heading to cancel, radians
    pub theta: f64,
    pub mirror_x: bool,
    pub mirror_y: bool,
}

impl SourcePose {
    pub fn new(centroid: Point2<f64>, theta: f64) -> Self {
        Self {
            centroid,
            theta,
            mirror_x: false,
            mirror_y: false,
        }
    }

    /// Pose of a placed object; doors and windows get a quarter turn added
    pub fn from_placement(centroid: Point2<f64>, placement: &ObjectPlacement) -> Self {
        let mut theta = placement.angle;
        if placement.class.has_quarter_turn_offset() {
            theta += FRAC_PI_2;
        }
        Self {
            centroid,
            theta,
            mirror_x: placement.mirror_x,
            mirror_y: placement.mirror_y,
        }
    }
}

/// World-to-grid affine transform for one source object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EgoFrame {
    world_to_grid: Matrix3<f64>,
    grid_to_world: Matrix3<f64>,
}

impl EgoFrame {
    /// Wrap a homogeneous 2D transform, failing if it cannot be inverted
    pub fn from_matrix(world_to_grid: Matrix3<f64>) -> Result<Self> {
        let grid_to_world = world_to_grid
            .try_inverse()
            .ok_or(Error::SingularTransform)?;
        Ok(Self {
            world_to_grid,
            grid_to_world,
        })
    }

    #[inline]
    pub fn world_to_grid(&self, p: &Point2<f64>) -> Point2<f64> {
        self.world_to_grid.transform_point(p)
    }

    #[inline]
    pub fn grid_to_world(&self, p: &Point2<f64>) -> Point2<f64> {
        self.grid_to_world.transform_point(p)
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.world_to_grid
    }

    #[inline]
    pub fn inverse_matrix(&self) -> &Matrix3<f64> {
        &self.grid_to_world
    }
}

/// Builds [`EgoFrame`]s for a fixed grid size and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBuilder {
    pixels_per_meter: f64,
    resolution: usize,
}

impl FrameBuilder {
    pub fn new(pixels_per_meter: f64, resolution: usize) -> Result<Self> {
        if !(pixels_per_meter.is_finite() && pixels_per_meter > 0.0) {
            return Err(Error::InvalidScale(pixels_per_meter));
        }
        if resolution == 0 {
            return Err(Error::InvalidResolution(resolution));
        }
        Ok(Self {
            pixels_per_meter,
            resolution,
        })
    }

    #[inline]
    pub fn pixels_per_meter(&self) -> f64 {
        self.pixels_per_meter
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Grid position every source centroid lands on
    pub fn canonical_center(&self) -> Point2<f64> {
        let c = 0.5 * (self.resolution as f64 - 1.0);
        Point2::new(c, c)
    }

    /// Translation that moves `source` onto the canonical center
    pub fn canonical_translation(&self, source: &Point2<f64>) -> Vector2<f64> {
        self.canonical_center() - *source
    }

    /// Compose a world-to-grid transform
    ///
    /// `pivot` is the point rotation, mirroring and scaling happen about; it
    /// is the centroid of the geometry being drawn. `offset` is the vector
    /// from the source to that geometry when drawing a neighbor, expressed in
    /// world metres.
    ///
    /// Composition, outermost first:
    ///
    /// ```text
    /// T(d' * ppm - d') . T(translation) . T(pivot) . M . S(ppm) . R(-theta) . T(-pivot)
    /// ```
    ///
    /// where `d'` is `offset` rotated by `-theta` and mirrored like the source,
    /// and `M` the source's mirrors.
    pub fn build(
        &self,
        pivot: &Point2<f64>,
        translation: &Vector2<f64>,
        theta: f64,
        mirror_x: bool,
        mirror_y: bool,
        offset: Option<&Vector2<f64>>,
    ) -> Result<EgoFrame> {
        let mut m = Matrix3::identity();

        if let Some(offset) = offset {
            let mut d = Rotation2::new(-theta) * offset;
            if mirror_x {
                d.x = -d.x;
            }
            if mirror_y {
                d.y = -d.y;
            }
            m *= Matrix3::new_translation(&(d * self.pixels_per_meter - d));
        }

        m *= Matrix3::new_translation(translation);
        m *= Matrix3::new_translation(&pivot.coords);
        if mirror_x {
            m *= Matrix3::new_nonuniform_scaling(&Vector2::new(-1.0, 1.0));
        }
        if mirror_y {
            m *= Matrix3::new_nonuniform_scaling(&Vector2::new(1.0, -1.0));
        }
        m *= Matrix3::new_scaling(self.pixels_per_meter);
        m *= Matrix3::new_rotation(-theta);
        m *= Matrix3::new_translation(&-pivot.coords);

        EgoFrame::from_matrix(m)
    }

    /// Frame for drawing the source itself
    pub fn source_frame(&self, pose: &SourcePose) -> Result<EgoFrame> {
        self.build(
            &pose.centroid,
            &self.canonical_translation(&pose.centroid),
            pose.theta,
            pose.mirror_x,
            pose.mirror_y,
            None,
        )
    }

    /// Frame for drawing a neighbor whose centroid is `neighbor`
    pub fn neighbor_frame(&self, pose: &SourcePose, neighbor: &Point2<f64>) -> Result<EgoFrame> {
        let offset = *neighbor - pose.centroid;
        self.build(
            neighbor,
            &self.canonical_translation(&pose.centroid),
            pose.theta,
            pose.mirror_x,
            pose.mirror_y,
            Some(&offset),
        )
    }
}
