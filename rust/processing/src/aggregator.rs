// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-scene heatmap accumulation.
//!
//! For every object with a known category, each other categorised object and
//! each wall whose centroid lies within the proximity threshold is drawn into
//! the source's egocentric frame and added to the `(source, neighbor)`
//! heatmap.

use std::time::Instant;

use scene_heatmap_core::{CategoryTable, NodeId, Scene, Triangle};
use scene_heatmap_geometry::{
    FrameBuilder, OccupancyGrid, Point2, Rasterizer, SourcePose, WallClusterer,
};

use crate::category::CategoryResolver;
use crate::config::HeatmapConfig;
use crate::error::Result;
use crate::scene_index::SceneIndex;
use crate::state::{AggregationState, CoOccurrenceKey};

/// Geometry drawn as a neighbor
#[derive(Debug, Clone)]
struct Neighbor {
    centroid: Point2<f64>,
    triangles: Vec<Triangle>,
}

/// A categorised object of the scene being processed
#[derive(Debug, Clone)]
struct Located<'a> {
    node: NodeId,
    category: &'a str,
    pose: SourcePose,
    shape: Neighbor,
}

/// Counts describing one processed scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneSummary {
    /// Object nodes found in the tree
    pub objects: usize,
    /// Objects with a category and geometry
    pub located: usize,
    /// Wall neighbors after clustering
    pub walls: usize,
    /// Neighbor drawings added to heatmaps
    pub pairs: usize,
}

/// Turns scenes into [`AggregationState`]s
#[derive(Debug, Clone)]
pub struct HeatmapAggregator<'a> {
    config: HeatmapConfig,
    resolver: CategoryResolver<'a>,
    frames: FrameBuilder,
    rasterizer: Rasterizer,
    clusterer: WallClusterer,
    empty: AggregationState,
}

impl<'a> HeatmapAggregator<'a> {
    pub fn new(config: HeatmapConfig, table: &'a CategoryTable) -> Result<Self> {
        let resolution = config.resolution();
        Ok(Self {
            config,
            resolver: CategoryResolver::new(table),
            frames: FrameBuilder::new(config.pixels_per_meter, resolution)?,
            rasterizer: Rasterizer::new(config.out_of_grid_policy),
            clusterer: WallClusterer::new(
                config.wall_merge_tolerance,
                config.wall_orientation_epsilon,
            ),
            empty: AggregationState::new(&OccupancyGrid::new(
                resolution,
                config.pixels_per_meter,
            )?),
        })
    }

    #[inline]
    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    /// Empty state with this aggregator's grid shape
    pub fn empty_state(&self) -> AggregationState {
        self.empty.empty_like()
    }

    /// Process one scene into a fresh state
    ///
    /// Any error leaves nothing behind: the caller gets either the scene's
    /// complete contribution or the error.
    pub fn process_scene(&self, scene: &Scene) -> Result<(AggregationState, SceneSummary)> {
        let start = Instant::now();
        let index = SceneIndex::build(scene)?;
        let mut state = self.empty_state();
        let mut summary = SceneSummary {
            objects: index.objects.len(),
            ..Default::default()
        };

        let located = self.locate_objects(scene, &index)?;
        let walls = self.wall_neighbors(scene, &index);
        summary.located = located.len();
        summary.walls = walls.len();

        self.register(&located, &mut state);

        let threshold = self.config.proximity_threshold;
        for (i, source) in located.iter().enumerate() {
            for (j, neighbor) in located.iter().enumerate() {
                if i == j {
                    continue;
                }
                if (neighbor.shape.centroid - source.pose.centroid).norm() < threshold {
                    let key = CoOccurrenceKey::new(source.category, neighbor.category);
                    self.draw(&source.pose, &neighbor.shape, key, &mut state)?;
                    summary.pairs += 1;
                }
            }

            for wall in &walls {
                if (wall.centroid - source.pose.centroid).norm() < threshold {
                    self.draw(&source.pose, wall, CoOccurrenceKey::wall(source.category), &mut state)?;
                    summary.pairs += 1;
                }
            }

            tracing::trace!(node = %source.node, category = source.category, "drew neighbors");
        }

        tracing::debug!(
            scene = %scene.name,
            objects = summary.objects,
            located = summary.located,
            walls = summary.walls,
            pairs = summary.pairs,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "updated heatmaps"
        );
        Ok((state, summary))
    }

    /// Categorised objects with geometry, in tree order
    fn locate_objects(&self, scene: &Scene, index: &SceneIndex) -> Result<Vec<Located<'a>>> {
        let mut located = Vec::with_capacity(index.objects.len());
        for &id in &index.objects {
            let node = scene.node(id);
            let Some(category) = self.resolver.resolve(node)? else {
                continue;
            };
            let Some(centroid) = scene.centroid(id) else {
                tracing::debug!(object = %node.name, "skipping object without geometry");
                continue;
            };

            let centroid = Point2::new(centroid.x, centroid.y);
            let pose = match &node.placement {
                Some(placement) => SourcePose::from_placement(centroid, placement),
                None => SourcePose::new(centroid, 0.0),
            };
            located.push(Located {
                node: id,
                category,
                pose,
                shape: Neighbor {
                    centroid,
                    triangles: node.meshes.iter().flat_map(|m| m.triangles()).collect(),
                },
            });
        }
        Ok(located)
    }

    /// Wall clusters, or whole wall nodes when clustering is off
    fn wall_neighbors(&self, scene: &Scene, index: &SceneIndex) -> Vec<Neighbor> {
        if self.config.cluster_walls {
            let meshes = index
                .walls
                .iter()
                .flat_map(|&id| scene.node(id).meshes.iter());
            return self
                .clusterer
                .cluster_meshes(meshes)
                .into_iter()
                .map(|cluster| {
                    let c = cluster.centroid();
                    Neighbor {
                        centroid: Point2::new(c.x, c.y),
                        triangles: cluster.into_triangles(),
                    }
                })
                .collect();
        }

        index
            .walls
            .iter()
            .filter_map(|&id| {
                let c = scene.centroid(id)?;
                Some(Neighbor {
                    centroid: Point2::new(c.x, c.y),
                    triangles: scene
                        .node(id)
                        .meshes
                        .iter()
                        .flat_map(|m| m.triangles())
                        .collect(),
                })
            })
            .collect()
    }

    /// Keys for every co-present pair and each source's walls
    fn register(&self, located: &[Located<'a>], state: &mut AggregationState) {
        for (i, source) in located.iter().enumerate() {
            state.record_object(source.category);
            for (j, neighbor) in located.iter().enumerate() {
                if i != j {
                    state.register(CoOccurrenceKey::new(source.category, neighbor.category));
                }
            }
            state.register(CoOccurrenceKey::wall(source.category));
        }
    }

    fn draw(
        &self,
        pose: &SourcePose,
        neighbor: &Neighbor,
        key: CoOccurrenceKey,
        state: &mut AggregationState,
    ) -> Result<()> {
        let frame = self.frames.neighbor_frame(pose, &neighbor.centroid)?;
        self.rasterizer
            .draw(&neighbor.triangles, &frame, state.record_draw(key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_heatmap_core::{NodeKind, ObjectClass, ObjectPlacement, TriangleMesh};
    use scene_heatmap_geometry::Point3;

    fn square(cx: f64, cy: f64, half: f64) -> TriangleMesh {
        let p = |x: f64, y: f64| Point3::new(cx + x * half, cy + y * half, 0.0);
        TriangleMesh::from_triangles(&[
            Triangle::new(p(-1.0, -1.0), p(1.0, -1.0), p(1.0, 1.0)),
            Triangle::new(p(-1.0, -1.0), p(1.0, 1.0), p(-1.0, 1.0)),
        ])
    }

    fn table() -> CategoryTable {
        [("1", "chair"), ("2", "table")].into_iter().collect()
    }

    fn add(scene: &mut Scene, name: &str, mesh: TriangleMesh) {
        let root = scene.root().unwrap();
        scene.add_object(
            root,
            name,
            vec![mesh],
            ObjectPlacement::new(ObjectClass::Furniture, 0.0),
        ).unwrap();
    }

    #[test]
    fn test_unknown_ids_are_skipped() {
        let table = table();
        let aggregator = HeatmapAggregator::new(HeatmapConfig::coarse(), &table).unwrap();
        let mut scene = Scene::with_root("s");
        add(&mut scene, "Object_0_1", square(0.0, 0.0, 0.2));
        add(&mut scene, "Object_1_77", square(1.0, 0.0, 0.2));

        let (state, summary) = aggregator.process_scene(&scene).unwrap();
        assert_eq!(summary.objects, 2);
        assert_eq!(summary.located, 1);
        assert_eq!(state.object_count("chair"), 1);
        assert_eq!(state.heatmap_count(), 1);
        assert!(state.grid("chair", "wall").unwrap().is_zero());
    }

    #[test]
    fn test_far_apart_pairs_hold_no_grid() {
        let table: CategoryTable = (0..25)
            .map(|i| (i.to_string(), format!("category_{i}")))
            .collect();
        let aggregator = HeatmapAggregator::new(HeatmapConfig::fine(), &table).unwrap();
        let mut scene = Scene::with_root("s");
        for i in 0..25 {
            let mesh = square(100.0 * i as f64, 0.0, 0.2);
            add(&mut scene, &format!("Object_{i}_{i}"), mesh);
        }

        let (state, summary) = aggregator.process_scene(&scene).unwrap();
        assert_eq!(summary.located, 25);
        assert_eq!(summary.pairs, 0);
        // 24 neighbors plus the wall key per source
        assert_eq!(state.heatmap_count(), 25 * 25);
        assert_eq!(state.allocated_grids(), 0);
        assert!(state.grid("category_0", "category_1").unwrap().is_zero());
    }

    #[test]
    fn test_only_drawn_pairs_allocate() {
        let table = table();
        let aggregator = HeatmapAggregator::new(HeatmapConfig::coarse(), &table).unwrap();
        let mut scene = Scene::with_root("s");
        add(&mut scene, "Object_0_1", square(0.0, 0.0, 0.2));
        add(&mut scene, "Object_1_2", square(1.0, 0.0, 0.2));

        let (state, _) = aggregator.process_scene(&scene).unwrap();
        assert_eq!(state.heatmap_count(), 4);
        assert_eq!(state.allocated_grids(), 2);
        assert!(state.heatmap("chair", "wall").unwrap().grid.is_none());
    }

    #[test]
    fn test_malformed_name_fails_scene() {
        let table = table();
        let aggregator = HeatmapAggregator::new(HeatmapConfig::coarse(), &table).unwrap();
        let mut scene = Scene::with_root("s");
        add(&mut scene, "Object_0_1", square(0.0, 0.0, 0.2));
        add(&mut scene, "Chair", square(1.0, 0.0, 0.2));
        assert!(aggregator.process_scene(&scene).is_err());
    }

    #[test]
    fn test_whole_wall_nodes_when_not_clustering() {
        let table = table();
        let config = HeatmapConfig {
            cluster_walls: false,
            ..HeatmapConfig::coarse()
        };
        let aggregator = HeatmapAggregator::new(config, &table).unwrap();
        let mut scene = Scene::with_root("s");
        add(&mut scene, "Object_0_1", square(0.0, 0.0, 0.2));
        let root = scene.root().unwrap();
        scene.add_child(
            root,
            NodeKind::Wall,
            "Wall_0",
            vec![square(1.0, 0.0, 0.05), square(1.0, 1.0, 0.05)],
        ).unwrap();

        let (state, summary) = aggregator.process_scene(&scene).unwrap();
        assert_eq!(summary.walls, 1);
        assert_eq!(state.pair_count("chair", "wall"), 1);
        assert!(!state.grid("chair", "wall").unwrap().is_zero());
    }
}
