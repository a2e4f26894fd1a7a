// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall fragment clustering
//!
//! Room wall files hold one shape per wall fragment, and a single physical
//! wall is often split across several of them. The clusterer merges fragments
//! back into walls:
//!
//! 1. A fragment's orientation compares the first vertex of its first
//!    triangle with the mean Y over all of its vertices. Within
//!    `orientation_epsilon` the fragment runs along X (horizontal); otherwise
//!    along Y. A closed box wall thus classifies the same whichever face
//!    comes first.
//! 2. Clusters of the same orientation are scanned in creation order. A
//!    horizontal fragment joins a cluster when its Y extent lies within the
//!    cluster's Y extent widened by `merge_tolerance` (X extent for vertical
//!    fragments). The first such cluster takes the fragment.
//! 3. A fragment matching nothing starts a new cluster.
//!
//! The first-match rule means a fragment that lies within tolerance of two
//! clusters always joins the older one, even when the other is closer.

use nalgebra::Point3;
use scene_heatmap_core::{Triangle, TriangleMesh};

/// Default orientation test tolerance in metres
pub const DEFAULT_ORIENTATION_EPSILON: f64 = 0.1;

/// Direction a wall runs in the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Runs along X, thin in Y
    Horizontal,
    /// Runs along Y, thin in X
    Vertical,
}

/// Axis-aligned extrema of every vertex seen by a cluster or fragment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent2 {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Extent2 {
    fn from_point(p: &Point3<f64>) -> Self {
        Self {
            min_x: p.x,
            max_x: p.x,
            min_y: p.y,
            max_y: p.y,
        }
    }

    fn expand(&mut self, p: &Point3<f64>) {
        self.min_x = self.min_x.min(p.x);
        self.max_x = self.max_x.max(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_y = self.max_y.max(p.y);
    }

    fn union(&mut self, other: &Extent2) {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
    }

    fn of_triangles(triangles: &[Triangle]) -> Option<Self> {
        let mut vertices = triangles.iter().flat_map(|t| t.vertices.iter());
        let mut extent = Self::from_point(vertices.next()?);
        vertices.for_each(|v| extent.expand(v));
        Some(extent)
    }

    /// Range across the wall's running direction
    fn across(&self, orientation: Orientation) -> (f64, f64) {
        match orientation {
            Orientation::Horizontal => (self.min_y, self.max_y),
            Orientation::Vertical => (self.min_x, self.max_x),
        }
    }

    /// Midpoint in the ground plane
    pub fn center(&self) -> (f64, f64) {
        (
            0.5 * (self.min_x + self.max_x),
            0.5 * (self.min_y + self.max_y),
        )
    }
}

/// Triangles of one wall fragment with the orientation read from them
#[derive(Debug, Clone)]
pub struct WallFragment {
    triangles: Vec<Triangle>,
    orientation: Orientation,
    extent: Extent2,
}

impl WallFragment {
    /// Classify a fragment, `None` when it has no triangles
    pub fn new(triangles: Vec<Triangle>, orientation_epsilon: f64) -> Option<Self> {
        let anchor = triangles.first()?.v0().y;
        let orientation = if (mean_y(&triangles) - anchor).abs() < orientation_epsilon {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        let extent = Extent2::of_triangles(&triangles)?;
        Some(Self {
            triangles,
            orientation,
            extent,
        })
    }

    pub fn from_mesh(mesh: &TriangleMesh, orientation_epsilon: f64) -> Option<Self> {
        Self::new(mesh.triangles().collect(), orientation_epsilon)
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[inline]
    pub fn extent(&self) -> &Extent2 {
        &self.extent
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }
}

fn mean_y(triangles: &[Triangle]) -> f64 {
    let sum: f64 = triangles
        .iter()
        .flat_map(|t| t.vertices.iter())
        .map(|v| v.y)
        .sum();
    sum / (3 * triangles.len()) as f64
}

/// A merged wall: fragments that share orientation and line
#[derive(Debug, Clone)]
pub struct WallCluster {
    orientation: Orientation,
    extent: Extent2,
    triangles: Vec<Triangle>,
    fragment_count: usize,
}

impl WallCluster {
    fn seed(fragment: WallFragment) -> Self {
        Self {
            orientation: fragment.orientation,
            extent: fragment.extent,
            triangles: fragment.triangles,
            fragment_count: 1,
        }
    }

    fn accepts(&self, fragment: &WallFragment, tolerance: f64) -> bool {
        if fragment.orientation != self.orientation {
            return false;
        }
        let (lo, hi) = self.extent.across(self.orientation);
        let (frag_lo, frag_hi) = fragment.extent.across(self.orientation);
        frag_lo >= lo - tolerance && frag_hi <= hi + tolerance
    }

    fn absorb(&mut self, fragment: WallFragment) {
        self.extent.union(&fragment.extent);
        self.triangles.extend(fragment.triangles);
        self.fragment_count += 1;
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[inline]
    pub fn extent(&self) -> &Extent2 {
        &self.extent
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn into_triangles(self) -> Vec<Triangle> {
        self.triangles
    }

    /// Centroid of the cluster's bounding box at ground level
    pub fn centroid(&self) -> Point3<f64> {
        let (x, y) = self.extent.center();
        Point3::new(x, y, 0.0)
    }
}

/// Groups wall fragments into [`WallCluster`]s
#[derive(Debug, Clone, Copy)]
pub struct WallClusterer {
    merge_tolerance: f64,
    orientation_epsilon: f64,
}

impl WallClusterer {
    pub fn new(merge_tolerance: f64, orientation_epsilon: f64) -> Self {
        Self {
            merge_tolerance,
            orientation_epsilon,
        }
    }

    pub fn with_tolerance(merge_tolerance: f64) -> Self {
        Self::new(merge_tolerance, DEFAULT_ORIENTATION_EPSILON)
    }

    #[inline]
    pub fn merge_tolerance(&self) -> f64 {
        self.merge_tolerance
    }

    /// Cluster a list of fragment meshes, skipping empty ones
    pub fn cluster_meshes<'a>(
        &self,
        meshes: impl IntoIterator<Item = &'a TriangleMesh>,
    ) -> Vec<WallCluster> {
        self.cluster(
            meshes
                .into_iter()
                .filter_map(|mesh| WallFragment::from_mesh(mesh, self.orientation_epsilon)),
        )
    }

    /// Cluster already classified fragments
    pub fn cluster(&self, fragments: impl IntoIterator<Item = WallFragment>) -> Vec<WallCluster> {
        let mut clusters = Vec::new();
        for fragment in fragments {
            self.insert(&mut clusters, fragment);
        }
        clusters
    }

    /// Move one fragment into the first compatible cluster or a new one
    pub fn insert(&self, clusters: &mut Vec<WallCluster>, fragment: WallFragment) {
        match clusters
            .iter_mut()
            .find(|c| c.accepts(&fragment, self.merge_tolerance))
        {
            Some(cluster) => cluster.absorb(fragment),
            None => clusters.push(WallCluster::seed(fragment)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Vertical quad in the plane y = `y` spanning x0..x1
    fn horizontal_wall(x0: f64, x1: f64, y: f64) -> Vec<Triangle> {
        vec![
            Triangle::new(
                Point3::new(x0, y, 0.0),
                Point3::new(x1, y, 0.0),
                Point3::new(x1, y, 2.5),
            ),
            Triangle::new(
                Point3::new(x0, y, 0.0),
                Point3::new(x1, y, 2.5),
                Point3::new(x0, y, 2.5),
            ),
        ]
    }

    /// Vertical quad in the plane x = `x` spanning y0..y1
    fn vertical_wall(x: f64, y0: f64, y1: f64) -> Vec<Triangle> {
        vec![
            Triangle::new(
                Point3::new(x, y0, 0.0),
                Point3::new(x, y1, 0.0),
                Point3::new(x, y1, 2.5),
            ),
            Triangle::new(
                Point3::new(x, y0, 0.0),
                Point3::new(x, y1, 2.5),
                Point3::new(x, y0, 2.5),
            ),
        ]
    }

    /// Closed box wall over x0..x1 by y0..y1, starting with the y = y0 cap
    fn box_wall(x0: f64, x1: f64, y0: f64, y1: f64) -> Vec<Triangle> {
        let quad = |a: Point3<f64>, b: Point3<f64>, c: Point3<f64>, d: Point3<f64>| {
            [Triangle::new(a, b, c), Triangle::new(a, c, d)]
        };
        let p = Point3::new;
        let mut triangles = Vec::with_capacity(12);
        // caps at either end of the Y run
        triangles.extend(quad(p(x0, y0, 0.0), p(x1, y0, 0.0), p(x1, y0, 2.5), p(x0, y0, 2.5)));
        triangles.extend(quad(p(x0, y1, 0.0), p(x1, y1, 0.0), p(x1, y1, 2.5), p(x0, y1, 2.5)));
        // long sides
        triangles.extend(quad(p(x0, y0, 0.0), p(x0, y1, 0.0), p(x0, y1, 2.5), p(x0, y0, 2.5)));
        triangles.extend(quad(p(x1, y0, 0.0), p(x1, y1, 0.0), p(x1, y1, 2.5), p(x1, y0, 2.5)));
        // top and bottom
        triangles.extend(quad(p(x0, y0, 2.5), p(x1, y0, 2.5), p(x1, y1, 2.5), p(x0, y1, 2.5)));
        triangles.extend(quad(p(x0, y0, 0.0), p(x1, y0, 0.0), p(x1, y1, 0.0), p(x0, y1, 0.0)));
        triangles
    }

    fn fragment(triangles: Vec<Triangle>) -> WallFragment {
        WallFragment::new(triangles, DEFAULT_ORIENTATION_EPSILON).unwrap()
    }

    #[test]
    fn test_orientation_of_flat_quads() {
        assert_eq!(
            fragment(horizontal_wall(0.0, 4.0, 1.0)).orientation(),
            Orientation::Horizontal
        );
        assert_eq!(
            fragment(vertical_wall(1.0, 0.0, 3.0)).orientation(),
            Orientation::Vertical
        );
        assert!(WallFragment::new(Vec::new(), 0.1).is_none());
    }

    #[test]
    fn test_box_wall_orientation_ignores_face_order() {
        // the end cap comes first and lies flat along X
        assert_eq!(
            fragment(box_wall(0.0, 0.1, 0.0, 3.0)).orientation(),
            Orientation::Vertical
        );
        assert_eq!(
            fragment(box_wall(0.0, 4.0, 0.0, 0.1)).orientation(),
            Orientation::Horizontal
        );
    }

    #[test]
    fn test_box_wall_segments_merge() {
        let clusters = WallClusterer::with_tolerance(0.5).cluster([
            fragment(box_wall(0.0, 0.1, 0.0, 3.0)),
            fragment(box_wall(0.0, 0.1, 3.0, 6.0)),
        ]);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].orientation(), Orientation::Vertical);
        assert_eq!(clusters[0].fragment_count(), 2);
        assert_relative_eq!(clusters[0].extent().max_y, 6.0);
    }

    #[test]
    fn test_collinear_fragments_merge() {
        let clusterer = WallClusterer::with_tolerance(0.5);
        let clusters = clusterer.cluster([
            fragment(horizontal_wall(0.0, 2.0, 0.0)),
            fragment(horizontal_wall(2.0, 4.0, 0.1)),
            fragment(vertical_wall(0.0, 0.0, 3.0)),
        ]);

        assert_eq!(clusters.len(), 2);
        let wall = &clusters[0];
        assert_eq!(wall.orientation(), Orientation::Horizontal);
        assert_eq!(wall.fragment_count(), 2);
        assert_eq!(wall.triangle_count(), 4);
        assert_relative_eq!(wall.extent().max_x, 4.0);
        assert_relative_eq!(wall.extent().max_y, 0.1);
    }

    #[test]
    fn test_tolerance_separates_parallel_walls() {
        let fragments = || {
            [
                fragment(horizontal_wall(0.0, 4.0, 0.0)),
                fragment(horizontal_wall(0.0, 4.0, 0.3)),
            ]
        };
        assert_eq!(WallClusterer::with_tolerance(0.5).cluster(fragments()).len(), 1);
        assert_eq!(WallClusterer::with_tolerance(0.2).cluster(fragments()).len(), 2);
    }

    #[test]
    fn test_orientation_never_mixes() {
        // crossing walls share coordinates but not orientation
        let clusters = WallClusterer::with_tolerance(10.0).cluster([
            fragment(horizontal_wall(0.0, 4.0, 0.0)),
            fragment(vertical_wall(0.0, 0.0, 4.0)),
        ]);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_first_match_wins() {
        let clusterer = WallClusterer::with_tolerance(0.5);
        let mut clusters = clusterer.cluster([
            fragment(horizontal_wall(0.0, 1.0, 0.0)),
            fragment(horizontal_wall(0.0, 1.0, 0.8)),
        ]);
        assert_eq!(clusters.len(), 2);

        // within tolerance of both, closer to the second
        clusterer.insert(&mut clusters, fragment(horizontal_wall(0.0, 1.0, 0.4)));
        assert_eq!(clusters[0].fragment_count(), 2);
        assert_eq!(clusters[1].fragment_count(), 1);
    }

    #[test]
    fn test_cluster_meshes_skips_empty() {
        let meshes = vec![
            TriangleMesh::new(),
            TriangleMesh::from_triangles(&vertical_wall(2.0, 0.0, 1.0)),
        ];
        let clusters = WallClusterer::with_tolerance(0.5).cluster_meshes(&meshes);
        assert_eq!(clusters.len(), 1);
        assert_relative_eq!(clusters[0].centroid(), Point3::new(2.0, 0.5, 0.0));
    }
}
